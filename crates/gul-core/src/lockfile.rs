use anyhow::Context;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = ".gul.lock";

/// Held for the whole run so two invocations never share a workdir's checkouts.
#[derive(Debug)]
pub struct WorkdirLock {
    path: PathBuf,
    file: File,
}

impl WorkdirLock {
    pub fn try_acquire(workdir: &Path) -> anyhow::Result<Option<Self>> {
        let path = workdir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("open lockfile {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { path, file })),
            Err(err) if is_lock_held(&err) => Ok(None),
            Err(err) => Err(err).context("lock workdir"),
        }
    }

    pub fn acquire(workdir: &Path) -> anyhow::Result<Self> {
        Self::try_acquire(workdir)?.with_context(|| {
            format!(
                "workdir {} is in use by another gul process",
                workdir.display()
            )
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkdirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn is_lock_held(err: &std::io::Error) -> bool {
    if err.kind() == std::io::ErrorKind::WouldBlock {
        return true;
    }
    matches!(err.raw_os_error(), Some(33))
}
