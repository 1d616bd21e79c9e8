use super::*;
pub(in crate::cli) fn status_marker(kind: StepKind) -> &'static str {
    match kind {
        StepKind::SettingUp => "🔨",
        StepKind::RunningJob => "⚙",
        StepKind::JobFinished => "🏁",
        StepKind::Committed => "💾",
        StepKind::Pushed => "☁",
        StepKind::Failed => "❌",
    }
}

pub(in crate::cli) fn format_step(event: &StepEvent) -> String {
    format!(
        "{}  {}: {}",
        status_marker(event.kind),
        event.target,
        event.detail
    )
}

pub(in crate::cli) fn print_event(event: &PoolEvent) {
    if let PoolEvent::Step(step) = event {
        println!("{}", format_step(step));
    }
}

pub(in crate::cli) fn format_summary(summary: &RunSummary) -> String {
    format!(
        "{} target(s): {} pushed to dev, {} pushed to origin, {} skipped, {} failed (setup {}, job {}, commit {}, push {})",
        summary.total(),
        summary.pushed_dev,
        summary.pushed_origin,
        summary.skipped,
        summary.failed(),
        summary.setup_failed,
        summary.job_failed,
        summary.commit_failed,
        summary.push_failed
    )
}

pub(in crate::cli) fn print_summary(summary: &RunSummary) {
    println!("{}", format_summary(summary));
}

/// Failed targets in the order they finished, ready to copy back into `targets.txt`.
pub(in crate::cli) fn format_failures(reports: &[TargetReport]) -> Option<String> {
    let lines: Vec<String> = reports
        .iter()
        .filter(|report| report.outcome.is_failure())
        .map(|report| format!("  {} ({})", report.target, report.outcome.as_str()))
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!("failed target(s):\n{}", lines.join("\n")))
}

pub(in crate::cli) fn print_failures(reports: &[TargetReport]) {
    if let Some(block) = format_failures(reports) {
        println!("{block}");
    }
}
