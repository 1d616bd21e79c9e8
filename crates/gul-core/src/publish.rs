use crate::remote::{DEV_REMOTE, ORIGIN_REMOTE, branch_refspec, remote_callbacks};
use git2::{ErrorClass, ErrorCode, IndexAddOption, Oid, PushOptions, Repository, Signature};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("nothing to commit: working tree matches HEAD")]
    Empty,
    #[error(transparent)]
    Git(#[from] git2::Error),
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("remote {remote} could not be found: {message}")]
    RemoteNotFound { remote: String, message: String },
    #[error("remote {remote} rejected {refname}: {message}")]
    Rejected {
        remote: String,
        refname: String,
        message: String,
    },
    #[error("push to {remote} failed: {source}")]
    Other {
        remote: String,
        #[source]
        source: git2::Error,
    },
}

impl PushError {
    pub fn is_remote_not_found(&self) -> bool {
        matches!(self, PushError::RemoteNotFound { .. })
    }

    fn from_git(remote: &str, err: git2::Error) -> Self {
        let missing_remote =
            err.code() == ErrorCode::NotFound && err.class() != ErrorClass::Reference;
        if missing_remote || is_not_found_message(err.message()) {
            PushError::RemoteNotFound {
                remote: remote.to_string(),
                message: err.message().to_string(),
            }
        } else {
            PushError::Other {
                remote: remote.to_string(),
                source: err,
            }
        }
    }
}

/// Servers report a missing project through the ssh channel as plain text, which
/// libgit2 surfaces without a structured code. Local lookups ("key not found", a
/// missing ref) must not match.
const SERVER_NOT_FOUND_PHRASES: &[&str] = &["could not be found", "repository not found"];

fn is_not_found_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    SERVER_NOT_FOUND_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PushedTo {
    Dev,
    Origin,
}

impl PushedTo {
    pub fn remote(&self) -> &'static str {
        match self {
            PushedTo::Dev => DEV_REMOTE,
            PushedTo::Origin => ORIGIN_REMOTE,
        }
    }
}

/// Stage everything (`add -A`) and commit on HEAD. An unchanged tree is an error.
pub fn commit_all(
    repo: &Repository,
    message: &str,
    author_name: &str,
    author_email: &str,
) -> Result<Oid, CommitError> {
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;
    let tree_id = index.write_tree()?;

    let parent = repo.head()?.peel_to_commit()?;
    if parent.tree_id() == tree_id {
        return Err(CommitError::Empty);
    }
    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now(author_name, author_email)?;
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &[&parent],
    )?;
    Ok(oid)
}

pub fn push_branch(repo: &Repository, remote_name: &str, branch: &str) -> Result<(), PushError> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|err| PushError::from_git(remote_name, err))?;
    let refspec = branch_refspec(branch);
    let mut rejected: Option<(String, String)> = None;
    {
        let mut callbacks = remote_callbacks();
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejected = Some((refname.to_string(), message.to_string()));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        info!(remote = %remote_name, refspec = %refspec, "pushing branch");
        remote
            .push(&[refspec.as_str()], Some(&mut options))
            .map_err(|err| PushError::from_git(remote_name, err))?;
    }
    match rejected {
        Some((refname, message)) => Err(PushError::Rejected {
            remote: remote_name.to_string(),
            refname,
            message,
        }),
        None => Ok(()),
    }
}

/// Try `dev` first; only a missing remote project sends the branch to `origin`, once.
pub fn push_with_fallback<F>(mut push: F) -> Result<PushedTo, PushError>
where
    F: FnMut(&str) -> Result<(), PushError>,
{
    match push(DEV_REMOTE) {
        Ok(()) => Ok(PushedTo::Dev),
        Err(err) if err.is_remote_not_found() => {
            warn!(error = %err, "dev remote unavailable; pushing to origin");
            push(ORIGIN_REMOTE)?;
            Ok(PushedTo::Origin)
        }
        Err(err) => Err(err),
    }
}

pub fn publish(repo: &Repository, branch: &str) -> Result<PushedTo, PushError> {
    push_with_fallback(|remote| push_branch(repo, remote, branch))
}
