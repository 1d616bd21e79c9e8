use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to start job {job}: {source}")]
    Spawn {
        job: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for job: {0}")]
    Wait(#[from] io::Error),
    #[error("{0}")]
    Failed(ExitStatus),
    #[error("job timed out after {0:?}")]
    TimedOut(Duration),
}

/// Run `job` inside `cwd`, sharing the operator's terminal. Only the exit status matters.
pub fn run_job(job: &Path, cwd: &Path, timeout: Option<Duration>) -> Result<(), JobError> {
    let mut child = Command::new(job)
        .current_dir(cwd)
        .spawn()
        .map_err(|source| JobError::Spawn {
            job: job.display().to_string(),
            source,
        })?;
    debug!(pid = child.id(), cwd = %cwd.display(), "job started");

    let status = match timeout {
        None => child.wait()?,
        Some(limit) => {
            let started = Instant::now();
            loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                if started.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(JobError::TimedOut(limit));
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(JobError::Failed(status))
    }
}
