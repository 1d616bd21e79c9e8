use super::render::{print_event, print_failures, print_summary};
use super::*;
pub(super) fn handle_push(args: PushArgs, config_path: &std::path::Path) -> anyhow::Result<()> {
    let workdir = Workdir::open(&args.workdir)?;
    let targets = workdir.targets()?;
    if args.list {
        println!();
        for target in &targets {
            println!("{target}");
        }
        return Ok(());
    }

    let job = workdir.job_path()?;
    let message = workdir.commit_message()?;
    let store = ConfigStore::load(config_path).context("load config")?;
    let config = RunConfiguration::from_store(
        &store,
        args.flags(),
        args.job_timeout.map(Duration::from_secs),
    )?;
    let lock = WorkdirLock::acquire(workdir.root())?;

    let count = args.count.map(|count| usize::try_from(count).unwrap_or(usize::MAX));
    let selected = select_targets(targets, count);
    info!(
        workdir = %workdir.root().display(),
        lock = %lock.path().display(),
        targets = selected.len(),
        "starting push run"
    );

    let steps = GitPipeline {
        workdir: workdir.root(),
        job: &job,
        message: &message,
        config: &config,
    };
    let mut reports = Vec::new();
    let summary = run_targets(&steps, config.flags, selected, WORKER_COUNT, |event| {
        print_event(&event);
        if let PoolEvent::Finished(report) = event {
            reports.push(report);
        }
    });
    print_summary(&summary);
    print_failures(&reports);
    drop(lock);
    Ok(())
}
