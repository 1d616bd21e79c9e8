use crate::model::Target;
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const TARGETS_FILE: &str = "targets.txt";
pub const MESSAGE_FILE: &str = "message.txt";
pub const JOB_FILE: &str = "job";

/// A batch directory holding the target list, commit message, job and checkouts.
#[derive(Clone, Debug)]
pub struct Workdir {
    root: PathBuf,
}

impl Workdir {
    /// Symlinks are kept as given: work branches are named after the directory the
    /// operator passed, not wherever it points.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let mut root = std::path::absolute(path)
            .with_context(|| format!("invalid workdir: {}", path.display()))?;
        if root.file_name().is_none() {
            // `..` or `/`: only resolving yields a nameable directory.
            root = root
                .canonicalize()
                .with_context(|| format!("invalid workdir: {}", path.display()))?;
        }
        if !root.is_dir() {
            anyhow::bail!("invalid workdir: {}", path.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn targets(&self) -> anyhow::Result<Vec<Target>> {
        load_targets(&self.root.join(TARGETS_FILE))
    }

    pub fn commit_message(&self) -> anyhow::Result<String> {
        read_commit_message(&self.root.join(MESSAGE_FILE))
    }

    pub fn job_path(&self) -> anyhow::Result<PathBuf> {
        let job = self.root.join(JOB_FILE);
        let meta = job
            .metadata()
            .with_context(|| format!("stat job file {}", job.display()))?;
        if !meta.is_file() {
            anyhow::bail!("job {} is not a file", job.display());
        }
        Ok(job)
    }
}

pub fn load_targets(path: &Path) -> anyhow::Result<Vec<Target>> {
    let file =
        File::open(path).with_context(|| format!("open target list {}", path.display()))?;
    let mut targets = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read target list {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let target = Target::parse(line)
            .with_context(|| format!("{}:{}", path.display(), index + 1))?;
        targets.push(target);
    }
    Ok(targets)
}

pub fn read_commit_message(path: &Path) -> anyhow::Result<String> {
    let file =
        File::open(path).with_context(|| format!("open commit message {}", path.display()))?;
    let mut body = String::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("read commit message {}", path.display()))?;
        body.push_str(&line);
        body.push('\n');
    }
    Ok(body)
}

/// Submission order for the pool: everything, or the first `count` targets.
pub fn select_targets(targets: Vec<Target>, count: Option<usize>) -> Vec<Target> {
    match count {
        Some(count) => targets.into_iter().take(count).collect(),
        None => targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn targets(raw: &[&str]) -> Vec<Target> {
        raw.iter().map(|t| Target::parse(t).unwrap()).collect()
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(TARGETS_FILE);
        fs::write(&path, "acme/widgets@main\n# acme/ignored@main\n").unwrap();
        let loaded = load_targets(&path).unwrap();
        assert_eq!(loaded, targets(&["acme/widgets@main"]));
    }

    #[test]
    fn trims_and_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(TARGETS_FILE);
        fs::write(
            &path,
            "  b/two@dev  \n\n\t\n   # comment\na/one@main\r\nc/three@16.0\n",
        )
        .unwrap();
        let loaded = load_targets(&path).unwrap();
        assert_eq!(loaded, targets(&["b/two@dev", "a/one@main", "c/three@16.0"]));
    }

    #[test]
    fn empty_list_is_valid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(TARGETS_FILE);
        fs::write(&path, "# nothing yet\n").unwrap();
        assert!(load_targets(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_list_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(load_targets(&tmp.path().join(TARGETS_FILE)).is_err());
    }

    #[test]
    fn malformed_line_reports_position() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(TARGETS_FILE);
        fs::write(&path, "a/one@main\nnot-a-target\n").unwrap();
        let err = load_targets(&path).unwrap_err();
        assert!(format!("{err:#}").contains(":2"));
    }

    #[test]
    fn commit_message_keeps_trailing_newlines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MESSAGE_FILE);
        fs::write(&path, "Bump dependencies\n\nDetails here").unwrap();
        assert_eq!(
            read_commit_message(&path).unwrap(),
            "Bump dependencies\n\nDetails here\n"
        );
    }

    #[test]
    fn count_limits_to_leading_targets() {
        let all = targets(&["a/one@main", "a/two@main", "a/three@main"]);
        assert_eq!(
            select_targets(all.clone(), Some(2)),
            targets(&["a/one@main", "a/two@main"])
        );
        assert_eq!(select_targets(all.clone(), None), all);
        assert_eq!(select_targets(all.clone(), Some(10)), all);
    }

    #[test]
    fn job_must_exist() {
        let tmp = TempDir::new().unwrap();
        let workdir = Workdir::open(tmp.path()).unwrap();
        assert!(workdir.job_path().is_err());
        fs::write(tmp.path().join(JOB_FILE), "#!/bin/sh\n").unwrap();
        assert!(workdir.job_path().unwrap().ends_with(JOB_FILE));
    }

    #[test]
    fn workdir_must_be_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, "").unwrap();
        assert!(Workdir::open(&file).is_err());
        assert!(Workdir::open(&tmp.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_workdir_keeps_its_own_name() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("run-42");
        fs::create_dir(&real).unwrap();
        let link = tmp.path().join("batch1");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let workdir = Workdir::open(&link).unwrap();
        assert_eq!(workdir.root(), link.as_path());
        let target = Target::parse("acme/widgets@main").unwrap();
        assert_eq!(target.new_branch(workdir.root()).unwrap(), "main-batch1");
    }

    #[test]
    fn parent_reference_resolves_to_a_named_directory() {
        let tmp = TempDir::new().unwrap();
        let batch = tmp.path().join("batch1");
        fs::create_dir_all(batch.join("nested")).unwrap();

        let workdir = Workdir::open(&batch.join("nested").join("..")).unwrap();
        assert_eq!(workdir.root().file_name().unwrap(), "batch1");
    }
}
