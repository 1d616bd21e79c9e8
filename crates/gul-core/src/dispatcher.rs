use crate::model::{RunFlags, Target};
use crate::pipeline::{PipelineSteps, StepEvent, TargetOutcome, TargetReport, process_target};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, mpsc};
use std::thread;
use tracing::{debug, info};

pub const WORKER_COUNT: usize = 8;

/// Bounded multi-producer multi-consumer queue. Every pushed item is popped exactly once;
/// `pop` returns `None` only after `close` and once the queue is drained.
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> WorkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Blocks while the queue is full. Items pushed after `close` are handed back.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        while state.items.len() >= self.capacity && !state.closed {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone)]
pub enum PoolEvent {
    Step(StepEvent),
    Finished(TargetReport),
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct RunSummary {
    pub pushed_dev: u32,
    pub pushed_origin: u32,
    pub skipped: u32,
    pub setup_failed: u32,
    pub job_failed: u32,
    pub commit_failed: u32,
    pub push_failed: u32,
}

impl RunSummary {
    pub fn record(&mut self, outcome: TargetOutcome) {
        match outcome {
            TargetOutcome::PushedToDev => self.pushed_dev += 1,
            TargetOutcome::PushedToOrigin => self.pushed_origin += 1,
            TargetOutcome::Skipped(_) => self.skipped += 1,
            TargetOutcome::SetupFailed => self.setup_failed += 1,
            TargetOutcome::JobFailed => self.job_failed += 1,
            TargetOutcome::CommitFailed => self.commit_failed += 1,
            TargetOutcome::PushFailed => self.push_failed += 1,
        }
    }

    pub fn failed(&self) -> u32 {
        self.setup_failed + self.job_failed + self.commit_failed + self.push_failed
    }

    pub fn total(&self) -> u32 {
        self.failed() + self.pushed_dev + self.pushed_origin + self.skipped
    }
}

pub(crate) fn normalized_workers(requested: usize, target_count: usize) -> usize {
    requested.max(1).min(target_count.max(1))
}

/// Run every target through the pipeline on a fixed pool of workers. Events are handed to
/// `on_event` on the calling thread; returns once every worker has exited.
pub fn run_targets<S, F>(
    steps: &S,
    flags: RunFlags,
    targets: Vec<Target>,
    workers: usize,
    mut on_event: F,
) -> RunSummary
where
    S: PipelineSteps,
    F: FnMut(PoolEvent),
{
    let workers = normalized_workers(workers, targets.len());
    let queue = WorkQueue::new(workers);
    let (tx, rx) = mpsc::channel::<PoolEvent>();
    let mut summary = RunSummary::default();
    info!(targets = targets.len(), workers, "dispatching targets");

    thread::scope(|scope| {
        let queue = &queue;
        for worker in 0..workers {
            let tx = tx.clone();
            scope.spawn(move || {
                while let Some(target) = queue.pop() {
                    let mut emit = |event: StepEvent| {
                        let _ = tx.send(PoolEvent::Step(event));
                    };
                    let report = process_target(steps, flags, &target, &mut emit);
                    let _ = tx.send(PoolEvent::Finished(report));
                }
                debug!(worker, "worker drained queue");
            });
        }
        drop(tx);

        scope.spawn(move || {
            for target in targets {
                if queue.push(target).is_err() {
                    break;
                }
            }
            queue.close();
        });

        for event in rx {
            if let PoolEvent::Finished(report) = &event {
                summary.record(report.outcome);
            }
            on_event(event);
        }
    });

    summary
}
