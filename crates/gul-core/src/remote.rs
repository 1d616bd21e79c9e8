use git2::{Cred, CredentialType, RemoteCallbacks};

pub const DEV_REMOTE: &str = "dev";
pub const ORIGIN_REMOTE: &str = "origin";

pub fn ssh_url(domain: &str, project: &str) -> String {
    format!("ssh://{domain}/{project}.git")
}

/// `group/name` -> `group-dev/name`. Projects without a namespace are returned as-is.
pub fn dev_project(project: &str) -> String {
    match project.split_once('/') {
        Some((namespace, rest)) => format!("{namespace}-dev/{rest}"),
        None => project.to_string(),
    }
}

pub fn branch_refspec(branch: &str) -> String {
    format!("refs/heads/{branch}:refs/heads/{branch}")
}

/// Hands out each credential kind once per connection; libgit2 calls back again after
/// a rejected credential and a repeat must fail.
#[derive(Debug, Default)]
pub(crate) struct CredentialAttempts {
    username: bool,
    agent: bool,
}

impl CredentialAttempts {
    pub(crate) fn next(
        &mut self,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        let username = username_from_url.unwrap_or("git");
        if allowed.contains(CredentialType::USERNAME) {
            if self.username {
                return Err(git2::Error::from_str(&format!(
                    "username {username} was rejected"
                )));
            }
            self.username = true;
            return Cred::username(username);
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            if self.agent {
                return Err(git2::Error::from_str(&format!(
                    "ssh-agent authentication failed for {username}"
                )));
            }
            self.agent = true;
            return Cred::ssh_key_from_agent(username);
        }
        Err(git2::Error::from_str("no supported credential type offered"))
    }
}

pub(crate) fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = CredentialAttempts::default();
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts.next(username_from_url, allowed)
    });
    callbacks
}
