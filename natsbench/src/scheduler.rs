use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace};

/// A scheduled task panicked.
#[derive(Debug, Clone, Error)]
#[error("task `{task}` panicked: {message}")]
pub struct SchedulerFault {
    pub task: String,
    pub message: String,
}

pub type Faults = UnboundedReceiver<SchedulerFault>;

/// Cancels one scheduled task.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Runs independently timed tasks on the tokio runtime.
///
/// Every task gets a child of the scheduler's root token, so `shutdown`
/// reaches all of them at once while a `TimerHandle` still cancels a single
/// one. Waiting is always a `tokio::time` suspension, which lets a paused test
/// clock drive the whole schedule.
pub struct Scheduler {
    root: CancellationToken,
    tracker: TaskTracker,
    faults: UnboundedSender<SchedulerFault>,
    shut_down: AtomicBool,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

impl Scheduler {
    pub fn new() -> (Scheduler, Faults) {
        let (faults, rx) = unbounded_channel();
        let scheduler = Scheduler {
            root: CancellationToken::new(),
            tracker: TaskTracker::new(),
            faults,
            shut_down: AtomicBool::new(false),
        };
        (scheduler, rx)
    }

    /// Spawns a task that owns its cancellation token. This is the building
    /// block for chains that reschedule themselves: the task loops, and checks
    /// the token at every suspension point.
    pub fn spawn<F, Fut>(&self, name: &str, f: F) -> TimerHandle
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();
        if token.is_cancelled() {
            trace!(task = name, "Scheduler is shut down, not spawning");
            return TimerHandle { token };
        }
        let task = AssertUnwindSafe(f(token.clone())).catch_unwind();
        let faults = self.faults.clone();
        let name = name.to_owned();
        self.tracker.spawn(async move {
            if let Err(panic) = task.await {
                let message = panic_message(&*panic);
                // nobody listening means we are already going down
                let _ = faults.send(SchedulerFault {
                    task: name,
                    message,
                });
            }
        });
        TimerHandle { token }
    }

    /// Runs `task` once, `delay` from now, unless cancelled first.
    pub fn after<Fut>(&self, name: &str, delay: Duration, task: Fut) -> TimerHandle
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(name, move |token| async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => (),
                _ = sleep(delay) => task.await,
            }
        })
    }

    /// Calls `f` every `period`, the first call happening one period from now.
    /// A late tick delays the following ones instead of bursting.
    pub fn every<F, Fut>(&self, name: &str, period: Duration, mut f: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(name, move |token| async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => f().await,
                }
            }
        })
    }

    /// Cancels every pending task. Returns `false` when the scheduler was
    /// already shut down.
    #[instrument(name = "Scheduler::shutdown", skip(self))]
    pub fn shutdown(&self) -> bool {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.root.cancel();
        self.tracker.close();
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Resolves once `shutdown` was called and every task has returned.
    pub async fn wait(&self) {
        self.tracker.wait().await
    }

    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }
}
