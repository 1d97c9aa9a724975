//! # Poll Scheduler
//!
//! Named background polling tasks sharing one lifecycle:
//!
//! - fixed interval, first run one interval after spawn
//! - optional random jitter added before each run
//! - pause/resume; a paused task performs no work and its next run is one
//!   full interval after resume
//! - cancellation through a [`CancellationToken`] per task, all children of
//!   the scheduler's root token
//!
//! Missed ticks are skipped, never bunched. Runs of one task never overlap.
//!
//! ```rust,no_run
//! use dashboard::scheduler::{PollSpec, Scheduler};
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let scheduler = Scheduler::new();
//! scheduler.spawn(PollSpec::new("market.trending", Duration::from_secs(60)), || async {
//!     tracing::debug!("refreshing trending securities");
//! });
//! scheduler.pause("market.trending");
//! # }
//! ```

use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Shortest period a task may poll at; `tokio::time::interval` rejects zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Schedule of one polling task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSpec {
    pub name: String,
    pub interval: Duration,
    /// Upper bound of the random delay added before each run
    pub jitter: Duration,
    pub start_paused: bool,
}

impl PollSpec {
    /// `interval` is raised to [`MIN_INTERVAL`] if shorter.
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval: interval.max(MIN_INTERVAL),
            jitter: Duration::ZERO,
            start_paused: false,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.start_paused = paused;
        self
    }
}

struct PollTask {
    paused: watch::Sender<bool>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of every polling task of a store (or of the whole client).
///
/// Dropping the scheduler cancels all of its tasks.
pub struct Scheduler {
    root: CancellationToken,
    tasks: Mutex<HashMap<String, PollTask>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a polling task. A running task with the same name is stopped
    /// first. Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(&self, spec: PollSpec, job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop(&spec.name);

        let cancel = self.root.child_token();
        let (paused_tx, paused_rx) = watch::channel(spec.start_paused);

        tracing::debug!(
            task = %spec.name,
            interval_ms = spec.interval.as_millis(),
            jitter_ms = spec.jitter.as_millis(),
            paused = spec.start_paused,
            "Poll task spawned"
        );

        let name = spec.name.clone();
        let handle = tokio::spawn(run_poll_loop(spec, job, paused_rx, cancel.clone()));

        self.tasks.lock().insert(
            name,
            PollTask {
                paused: paused_tx,
                cancel,
                handle,
            },
        );
    }

    /// Returns `false` when no task has that name.
    pub fn pause(&self, name: &str) -> bool {
        self.set_paused(name, true)
    }

    pub fn resume(&self, name: &str) -> bool {
        self.set_paused(name, false)
    }

    /// `None` when no task has that name.
    pub fn is_paused(&self, name: &str) -> Option<bool> {
        self.tasks.lock().get(name).map(|task| *task.paused.borrow())
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .get(name)
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Cancel one task. Returns `false` when no task has that name.
    pub fn stop(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(task) => {
                task.cancel.cancel();
                tracing::debug!(task = %name, "Poll task stopped");
                true
            }
            None => false,
        }
    }

    /// Cancel every task.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock();
        for task in tasks.values() {
            task.cancel.cancel();
        }
        let count = tasks.len();
        tasks.clear();
        tracing::debug!(count, "Scheduler shut down");
    }

    fn set_paused(&self, name: &str, paused: bool) -> bool {
        match self.tasks.lock().get(name) {
            Some(task) => {
                task.paused.send_if_modified(|current| {
                    let changed = *current != paused;
                    *current = paused;
                    changed
                });
                true
            }
            None => false,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn run_poll_loop<F, Fut>(
    spec: PollSpec,
    mut job: F,
    mut paused: watch::Receiver<bool>,
    cancel: CancellationToken,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = spec.interval.max(MIN_INTERVAL);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *paused.borrow_and_update() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = paused.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Resumed (or toggled again): restart the period from now.
                    ticker.reset();
                    continue;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = paused.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if !spec.jitter.is_zero() {
            let max_ms = spec.jitter.as_millis() as u64;
            let delay = Duration::from_millis(rand::rng().random_range(0..=max_ms));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if *paused.borrow() {
            continue;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = job() => {}
        }
    }

    tracing::trace!(task = %spec.name, "Poll loop exited");
}
