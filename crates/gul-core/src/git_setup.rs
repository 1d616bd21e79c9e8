use crate::remote::{DEV_REMOTE, dev_project, remote_callbacks, ssh_url};
use anyhow::Context;
use git2::{
    BranchType, ErrorCode, FetchOptions, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SetupOutcome {
    Cloned,
    Reopened,
}

/// Where a checkout comes from and which branch it works on.
#[derive(Debug, Clone)]
pub struct CheckoutSpec<'a> {
    pub clone_url: &'a str,
    pub dev_url: &'a str,
    pub branch: &'a str,
    pub new_branch: &'a str,
    pub depth: Option<i32>,
}

/// Targets only need the tip of their branch.
pub const SHALLOW_DEPTH: i32 = 1;

impl<'a> CheckoutSpec<'a> {
    pub fn shallow(
        clone_url: &'a str,
        dev_url: &'a str,
        branch: &'a str,
        new_branch: &'a str,
    ) -> Self {
        Self {
            clone_url,
            dev_url,
            branch,
            new_branch,
            depth: Some(SHALLOW_DEPTH),
        }
    }
}

/// Clone `project` at `branch` into `path` (or reopen an earlier clone), register the
/// `dev` remote and switch to `new_branch`. Re-running on a prepared checkout is a no-op.
pub fn setup_project(
    domain: &str,
    path: &Path,
    project: &str,
    branch: &str,
    new_branch: &str,
) -> anyhow::Result<(Repository, SetupOutcome)> {
    let clone_url = ssh_url(domain, project);
    let dev_url = ssh_url(domain, &dev_project(project));
    setup_checkout(
        path,
        &CheckoutSpec::shallow(&clone_url, &dev_url, branch, new_branch),
    )
}

pub fn setup_checkout(
    path: &Path,
    spec: &CheckoutSpec<'_>,
) -> anyhow::Result<(Repository, SetupOutcome)> {
    let (repo, outcome) = clone_or_open(path, spec)?;
    ensure_dev_remote(&repo, spec.dev_url)?;
    checkout_work_branch(&repo, spec.new_branch)?;
    Ok((repo, outcome))
}

fn clone_or_open(
    path: &Path,
    spec: &CheckoutSpec<'_>,
) -> anyhow::Result<(Repository, SetupOutcome)> {
    let mut fo = FetchOptions::new();
    fo.remote_callbacks(remote_callbacks());
    if let Some(depth) = spec.depth {
        fo.depth(depth);
    }
    let mut builder = RepoBuilder::new();
    builder.fetch_options(fo).branch(spec.branch);
    info!(path = %path.display(), url = %spec.clone_url, "cloning repo");
    match builder.clone(spec.clone_url, path) {
        Ok(repo) => Ok((repo, SetupOutcome::Cloned)),
        Err(err) if err.code() == ErrorCode::Exists => {
            debug!(path = %path.display(), "checkout already present; reopening");
            let repo = Repository::open(path).context("open existing checkout")?;
            Ok((repo, SetupOutcome::Reopened))
        }
        Err(err) => Err(err).context("clone repo"),
    }
}

fn ensure_dev_remote(repo: &Repository, dev_url: &str) -> anyhow::Result<()> {
    match repo.remote(DEV_REMOTE, dev_url) {
        Ok(_) => Ok(()),
        Err(err) if err.code() == ErrorCode::Exists => Ok(()),
        Err(err) => Err(err).context("create dev remote"),
    }
}

fn checkout_work_branch(repo: &Repository, new_branch: &str) -> anyhow::Result<()> {
    let branch = match repo.find_branch(new_branch, BranchType::Local) {
        Ok(branch) => {
            debug!(branch = %new_branch, "work branch already exists; resuming");
            branch
        }
        Err(err) if err.code() == ErrorCode::NotFound => {
            let head = repo
                .head()
                .and_then(|head| head.peel_to_commit())
                .context("resolve HEAD commit")?;
            repo.branch(new_branch, &head, false)
                .with_context(|| format!("create branch {new_branch}"))?
        }
        Err(err) => return Err(err).context("look up work branch"),
    };
    let refname = branch
        .get()
        .name()
        .context("work branch name is not valid utf-8")?
        .to_string();
    let target = branch
        .get()
        .peel_to_commit()
        .context("resolve work branch commit")?;
    let mut checkout = CheckoutBuilder::new();
    checkout.safe();
    repo.checkout_tree(target.as_object(), Some(&mut checkout))
        .with_context(|| format!("checkout {new_branch}"))?;
    repo.set_head(&refname)
        .with_context(|| format!("switch HEAD to {new_branch}"))?;
    Ok(())
}
