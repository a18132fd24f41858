//! Fixed-step tick scheduler
//!
//! [`FixedStepScheduler`] is the pure planner: given the current monotonic
//! time it says how many ticks are due, bounding catch-up after a stall and
//! resynchronising to `now + interval` instead of drifting. [`spawn`] drives
//! it on a tokio task and calls the tick handler synchronously, so ticks for
//! one session never overlap.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// What the scheduler decided for one wake-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub ticks: u32,
    /// Ticks that were due but dropped because of the catch-up cap
    pub dropped: u32,
}

impl TickPlan {
    pub fn resynced(&self) -> bool {
        self.dropped > 0
    }
}

#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    interval: Duration,
    max_catch_up: u32,
    next_tick: Instant,
}

impl FixedStepScheduler {
    /// First tick fires one interval after `now`
    pub fn new(interval: Duration, max_catch_up: u32, now: Instant) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            max_catch_up: max_catch_up.max(1),
            next_tick: now + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// Ticks to run now and advance the schedule
    pub fn plan(&mut self, now: Instant) -> TickPlan {
        if now < self.next_tick {
            return TickPlan { ticks: 0, dropped: 0 };
        }

        let behind = now.duration_since(self.next_tick);
        let due = 1 + (behind.as_nanos() / self.interval.as_nanos()) as u64;

        if due > self.max_catch_up as u64 {
            self.next_tick = now + self.interval;
            TickPlan {
                ticks: self.max_catch_up,
                dropped: (due - self.max_catch_up as u64).min(u32::MAX as u64) as u32,
            }
        } else {
            self.next_tick += self.interval * due as u32;
            TickPlan {
                ticks: due as u32,
                dropped: 0,
            }
        }
    }
}

/// Returned by the tick handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Context for one handler invocation
#[derive(Debug, Clone, Copy)]
pub struct TickInfo {
    /// Position within the current catch-up batch (0 = on time)
    pub batch_index: u32,
    pub plan: TickPlan,
}

impl TickInfo {
    pub fn is_catch_up(&self) -> bool {
        self.batch_index > 0
    }
}

/// Owner side of a running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// No further ticks start after this returns; a tick already running
    /// finishes normally.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop and wait for the task to exit
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.join.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
    }
}

/// Run `on_tick` on the schedule until it returns [`TickControl::Stop`] or
/// the handle is stopped.
pub fn spawn<F>(mut scheduler: FixedStepScheduler, mut on_tick: F) -> SchedulerHandle
where
    F: FnMut(TickInfo) -> TickControl + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        debug!("Scheduler started ({:?} interval)", scheduler.interval());

        'run: loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break 'run;
                    }
                    continue 'run;
                }
                _ = sleep_until(scheduler.next_tick()) => {}
            }

            let plan = scheduler.plan(Instant::now());
            if plan.resynced() {
                warn!(
                    "Tick loop fell behind, ran {} catch-up ticks and dropped {}",
                    plan.ticks, plan.dropped
                );
            }

            for batch_index in 0..plan.ticks {
                if *stop_rx.borrow() {
                    break 'run;
                }
                if on_tick(TickInfo { batch_index, plan }) == TickControl::Stop {
                    break 'run;
                }
            }
        }

        debug!("Scheduler stopped");
    });

    SchedulerHandle { stop_tx, join }
}
