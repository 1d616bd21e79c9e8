use crate::git_setup::setup_project;
use crate::job::run_job;
use crate::model::{RunConfiguration, RunFlags, Target};
use crate::publish::{PushedTo, commit_all, publish};
use git2::Repository;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Stage {
    Setup,
    Job,
    Commit,
    Push,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Job => "job",
            Stage::Commit => "commit",
            Stage::Push => "push",
        }
    }
}

/// Terminal state of one target. `Skipped` names the first stage a flag turned off.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TargetOutcome {
    SetupFailed,
    JobFailed,
    CommitFailed,
    PushFailed,
    PushedToDev,
    PushedToOrigin,
    Skipped(Stage),
}

impl TargetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOutcome::SetupFailed => "setup_failed",
            TargetOutcome::JobFailed => "job_failed",
            TargetOutcome::CommitFailed => "commit_failed",
            TargetOutcome::PushFailed => "push_failed",
            TargetOutcome::PushedToDev => "pushed_to_dev",
            TargetOutcome::PushedToOrigin => "pushed_to_origin",
            TargetOutcome::Skipped(_) => "skipped",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TargetOutcome::SetupFailed
                | TargetOutcome::JobFailed
                | TargetOutcome::CommitFailed
                | TargetOutcome::PushFailed
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StepKind {
    SettingUp,
    RunningJob,
    JobFinished,
    Committed,
    Pushed,
    Failed,
}

/// One operator-facing status line.
#[derive(Debug, Clone)]
pub struct StepEvent {
    pub target: String,
    pub kind: StepKind,
    pub detail: String,
}

impl StepEvent {
    fn new(target: &Target, kind: StepKind, detail: impl Into<String>) -> Self {
        Self {
            target: target.to_string(),
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetReport {
    pub target: Target,
    pub outcome: TargetOutcome,
    pub error: Option<String>,
}

/// The four side-effecting steps of a target, in order.
pub trait PipelineSteps: Sync {
    type Checkout;

    fn setup(&self, target: &Target) -> anyhow::Result<Self::Checkout>;
    fn run_job(&self, checkout: &Self::Checkout) -> anyhow::Result<()>;
    /// Returns the new commit id.
    fn commit(&self, checkout: &Self::Checkout) -> anyhow::Result<String>;
    fn publish(&self, checkout: &Self::Checkout) -> anyhow::Result<PushedTo>;
}

pub fn process_target<S: PipelineSteps>(
    steps: &S,
    flags: RunFlags,
    target: &Target,
    emit: &mut dyn FnMut(StepEvent),
) -> TargetReport {
    emit(StepEvent::new(target, StepKind::SettingUp, "setting up"));
    let checkout = match steps.setup(target) {
        Ok(checkout) => checkout,
        Err(err) => return failed(target, emit, TargetOutcome::SetupFailed, err),
    };
    if flags.no_work {
        return report(target, TargetOutcome::Skipped(Stage::Job), None);
    }

    emit(StepEvent::new(target, StepKind::RunningJob, "executing job"));
    if let Err(err) = steps.run_job(&checkout) {
        let message = format!("{err:#}");
        warn!(repo = %target, error = %message, "job failed");
        emit(StepEvent::new(target, StepKind::JobFinished, message.clone()));
        return report(target, TargetOutcome::JobFailed, Some(message));
    }
    emit(StepEvent::new(target, StepKind::JobFinished, "exit status 0"));
    if flags.no_commit {
        return report(target, TargetOutcome::Skipped(Stage::Commit), None);
    }

    match steps.commit(&checkout) {
        Ok(id) => emit(StepEvent::new(target, StepKind::Committed, format!("committed {id}"))),
        Err(err) => return failed(target, emit, TargetOutcome::CommitFailed, err),
    }
    if flags.no_push {
        return report(target, TargetOutcome::Skipped(Stage::Push), None);
    }

    match steps.publish(&checkout) {
        Ok(pushed) => {
            info!(repo = %target, remote = pushed.remote(), "pushed");
            emit(StepEvent::new(
                target,
                StepKind::Pushed,
                format!("pushed to {}", pushed.remote()),
            ));
            let outcome = match pushed {
                PushedTo::Dev => TargetOutcome::PushedToDev,
                PushedTo::Origin => TargetOutcome::PushedToOrigin,
            };
            report(target, outcome, None)
        }
        Err(err) => failed(target, emit, TargetOutcome::PushFailed, err),
    }
}

fn report(target: &Target, outcome: TargetOutcome, error: Option<String>) -> TargetReport {
    TargetReport {
        target: target.clone(),
        outcome,
        error,
    }
}

fn failed(
    target: &Target,
    emit: &mut dyn FnMut(StepEvent),
    outcome: TargetOutcome,
    err: anyhow::Error,
) -> TargetReport {
    let message = format!("{err:#}");
    warn!(repo = %target, outcome = outcome.as_str(), error = %message, "target failed");
    emit(StepEvent::new(target, StepKind::Failed, message.clone()));
    report(target, outcome, Some(message))
}

pub struct GitCheckout {
    pub repo: Repository,
    pub path: PathBuf,
    pub new_branch: String,
}

/// Real steps: git2 for the repository work, a child process for the job.
pub struct GitPipeline<'a> {
    pub workdir: &'a Path,
    pub job: &'a Path,
    pub message: &'a str,
    pub config: &'a RunConfiguration,
}

impl PipelineSteps for GitPipeline<'_> {
    type Checkout = GitCheckout;

    fn setup(&self, target: &Target) -> anyhow::Result<GitCheckout> {
        let path = target.local_path(self.workdir);
        let new_branch = target.new_branch(self.workdir)?;
        let (repo, outcome) = setup_project(
            &self.config.ssh_domain,
            &path,
            target.project(),
            target.branch(),
            &new_branch,
        )?;
        info!(repo = %target, branch = %new_branch, outcome = ?outcome, "checkout ready");
        Ok(GitCheckout {
            repo,
            path,
            new_branch,
        })
    }

    fn run_job(&self, checkout: &GitCheckout) -> anyhow::Result<()> {
        run_job(self.job, &checkout.path, self.config.job_timeout)?;
        Ok(())
    }

    fn commit(&self, checkout: &GitCheckout) -> anyhow::Result<String> {
        let oid = commit_all(
            &checkout.repo,
            self.message,
            &self.config.user_name,
            &self.config.user_email,
        )?;
        Ok(oid.to_string())
    }

    fn publish(&self, checkout: &GitCheckout) -> anyhow::Result<PushedTo> {
        Ok(publish(&checkout.repo, &checkout.new_branch)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every step call; fails the configured stages for the listed targets.
    #[derive(Default)]
    pub(crate) struct FakeSteps {
        pub(crate) failures: Vec<(String, Stage)>,
        pub(crate) fallback: HashSet<String>,
        pub(crate) calls: Mutex<Vec<(String, Stage)>>,
    }

    impl FakeSteps {
        fn step(&self, target: &str, stage: Stage) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_string(), stage));
            if self
                .failures
                .iter()
                .any(|(name, failing)| name == target && *failing == stage)
            {
                anyhow::bail!("{} failed", stage.as_str());
            }
            Ok(())
        }

        pub(crate) fn stages_for(&self, target: &str) -> Vec<Stage> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(name, _)| name == target)
                .map(|(_, stage)| *stage)
                .collect()
        }
    }

    impl PipelineSteps for FakeSteps {
        type Checkout = String;

        fn setup(&self, target: &Target) -> anyhow::Result<String> {
            self.step(target.as_str(), Stage::Setup)?;
            Ok(target.to_string())
        }

        fn run_job(&self, checkout: &String) -> anyhow::Result<()> {
            self.step(checkout, Stage::Job)
        }

        fn commit(&self, checkout: &String) -> anyhow::Result<String> {
            self.step(checkout, Stage::Commit)?;
            Ok("abc123".to_string())
        }

        fn publish(&self, checkout: &String) -> anyhow::Result<PushedTo> {
            self.step(checkout, Stage::Push)?;
            if self.fallback.contains(checkout) {
                Ok(PushedTo::Origin)
            } else {
                Ok(PushedTo::Dev)
            }
        }
    }

    fn run(steps: &FakeSteps, flags: RunFlags, raw: &str) -> (TargetReport, Vec<StepEvent>) {
        let target = Target::parse(raw).unwrap();
        let mut events = Vec::new();
        let report = process_target(steps, flags, &target, &mut |event| events.push(event));
        (report, events)
    }

    #[test]
    fn full_pipeline_pushes_to_dev() {
        let steps = FakeSteps::default();
        let (report, events) = run(&steps, RunFlags::default(), "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::PushedToDev);
        assert_eq!(
            steps.stages_for("acme/widgets@main"),
            vec![Stage::Setup, Stage::Job, Stage::Commit, Stage::Push]
        );
        let kinds: Vec<StepKind> = events.iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::SettingUp,
                StepKind::RunningJob,
                StepKind::JobFinished,
                StepKind::Committed,
                StepKind::Pushed,
            ]
        );
        assert_eq!(events[4].detail, "pushed to dev");
    }

    #[test]
    fn fallback_push_is_reported_distinctly() {
        let steps = FakeSteps {
            fallback: HashSet::from(["acme/widgets@main".to_string()]),
            ..FakeSteps::default()
        };
        let (report, events) = run(&steps, RunFlags::default(), "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::PushedToOrigin);
        assert_eq!(events.last().unwrap().detail, "pushed to origin");
    }

    #[test]
    fn job_failure_skips_commit_and_push() {
        let steps = FakeSteps {
            failures: vec![("acme/widgets@main".into(), Stage::Job)],
            ..FakeSteps::default()
        };
        let (report, events) = run(&steps, RunFlags::default(), "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::JobFailed);
        assert_eq!(report.error.as_deref(), Some("job failed"));
        assert_eq!(
            steps.stages_for("acme/widgets@main"),
            vec![Stage::Setup, Stage::Job]
        );
        assert_eq!(events.last().unwrap().kind, StepKind::JobFinished);
    }

    #[test]
    fn setup_failure_stops_the_target() {
        let steps = FakeSteps {
            failures: vec![("acme/widgets@main".into(), Stage::Setup)],
            ..FakeSteps::default()
        };
        let (report, events) = run(&steps, RunFlags::default(), "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::SetupFailed);
        assert_eq!(steps.stages_for("acme/widgets@main"), vec![Stage::Setup]);
        assert_eq!(events.last().unwrap().kind, StepKind::Failed);
    }

    #[test]
    fn no_work_stops_after_checkout() {
        let steps = FakeSteps::default();
        let flags = RunFlags {
            no_work: true,
            ..RunFlags::default()
        };
        let (report, _) = run(&steps, flags, "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::Skipped(Stage::Job));
        assert_eq!(steps.stages_for("acme/widgets@main"), vec![Stage::Setup]);
    }

    #[test]
    fn no_commit_never_commits() {
        let flags = RunFlags {
            no_commit: true,
            ..RunFlags::default()
        };
        let steps = FakeSteps::default();
        let (report, _) = run(&steps, flags, "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::Skipped(Stage::Commit));
        assert!(!steps.stages_for("acme/widgets@main").contains(&Stage::Commit));

        let steps = FakeSteps {
            failures: vec![("acme/widgets@main".into(), Stage::Job)],
            ..FakeSteps::default()
        };
        let (report, _) = run(&steps, flags, "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::JobFailed);
        assert!(!steps.stages_for("acme/widgets@main").contains(&Stage::Commit));
    }

    #[test]
    fn no_push_commits_but_never_pushes() {
        let steps = FakeSteps::default();
        let flags = RunFlags {
            no_push: true,
            ..RunFlags::default()
        };
        let (report, _) = run(&steps, flags, "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::Skipped(Stage::Push));
        assert_eq!(
            steps.stages_for("acme/widgets@main"),
            vec![Stage::Setup, Stage::Job, Stage::Commit]
        );
    }

    #[test]
    fn commit_failure_is_recorded() {
        let steps = FakeSteps {
            failures: vec![("acme/widgets@main".into(), Stage::Commit)],
            ..FakeSteps::default()
        };
        let (report, _) = run(&steps, RunFlags::default(), "acme/widgets@main");
        assert_eq!(report.outcome, TargetOutcome::CommitFailed);
        assert!(report.outcome.is_failure());
        assert!(!steps.stages_for("acme/widgets@main").contains(&Stage::Push));
    }
}
