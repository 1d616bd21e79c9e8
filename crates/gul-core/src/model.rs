use crate::config::ConfigStore;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TargetParseError {
    #[error("target `{0}` must have the form project@branch")]
    MissingBranch(String),
    #[error("target `{0}` names an empty project or branch")]
    Empty(String),
    #[error("project `{0}` must include a namespace (group/name)")]
    MissingNamespace(String),
}

/// A single `project@branch` entry from the target list.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Target {
    raw: String,
    project: String,
    branch: String,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, TargetParseError> {
        let (project, branch) = raw
            .split_once('@')
            .ok_or_else(|| TargetParseError::MissingBranch(raw.to_string()))?;
        if branch.contains('@') {
            return Err(TargetParseError::MissingBranch(raw.to_string()));
        }
        if project.is_empty() || branch.is_empty() {
            return Err(TargetParseError::Empty(raw.to_string()));
        }
        match project.split_once('/') {
            Some((ns, rest)) if !ns.is_empty() && !rest.is_empty() => {}
            _ => return Err(TargetParseError::MissingNamespace(project.to_string())),
        }
        Ok(Self {
            raw: raw.to_string(),
            project: project.to_string(),
            branch: branch.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Directory name of the checkout, stable across runs.
    pub fn dir_name(&self) -> String {
        self.raw.replace(['@', '/'], "-")
    }

    pub fn local_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(self.dir_name())
    }

    /// Working branch name: the source branch suffixed with the workdir's name,
    /// so batches sharing a project do not collide on the remote.
    pub fn new_branch(&self, workdir: &Path) -> anyhow::Result<String> {
        let local = self.local_path(workdir);
        let batch = local
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("workdir {} has no usable directory name", workdir.display())
            })?;
        Ok(format!("{}-{batch}", self.branch))
    }
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunFlags {
    pub no_work: bool,
    pub no_commit: bool,
    pub no_push: bool,
}

/// Everything a worker needs besides the target itself. Built once, never mutated.
#[derive(Clone, Debug)]
pub struct RunConfiguration {
    pub flags: RunFlags,
    pub user_name: String,
    pub user_email: String,
    pub ssh_domain: String,
    pub job_timeout: Option<Duration>,
}

impl RunConfiguration {
    pub fn from_store(
        store: &ConfigStore,
        flags: RunFlags,
        job_timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let ssh_domain = store.get("ssh.domain").unwrap_or_default().to_string();
        if ssh_domain.is_empty() {
            anyhow::bail!("ssh.domain is not configured; run `gul config ssh.domain <host>`");
        }
        let user_name = store.get("user.name").unwrap_or_default().to_string();
        let user_email = store.get("user.email").unwrap_or_default().to_string();
        if !flags.no_work && !flags.no_commit && (user_name.is_empty() || user_email.is_empty()) {
            anyhow::bail!("user.name and user.email must be configured before committing");
        }
        Ok(Self {
            flags,
            user_name,
            user_email,
            ssh_domain,
            job_timeout,
        })
    }
}
