//! `Scheduler`: the async half of spec.md §4.1's "TimerWheel & Scheduler"
//! component. `oonf_core::timer::TimerWheel` is synchronous and
//! clock-agnostic; this drives it from `tokio::time` and folds in socket
//! readiness, so the whole daemon runs as one cooperative, single-task
//! event loop (spec.md §1's design goal).

use std::time::{Duration, Instant};

use oonf_core::timer::{TimerHandle, TimerWheel};
use tokio::time::sleep;

/// Wraps a `TimerWheel` with a real clock. `start` is the wall-clock
/// instant the wheel's `now_ms == 0` corresponds to, so every `TimerHandle`
/// due time can be translated to a `tokio::time::sleep` deadline.
pub struct Scheduler {
    wheel: TimerWheel,
    start: Instant,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            wheel: TimerWheel::new(0),
            start: Instant::now(),
        }
    }

    pub fn wheel(&mut self) -> &mut TimerWheel {
        &mut self.wheel
    }

    fn now_ms(&self) -> u64 {
        Instant::now().saturating_duration_since(self.start).as_millis() as u64
    }

    /// Sleeps until the wheel's next due timer (or forever, if none is
    /// armed, until some other event wakes the caller's `select!`), then
    /// advances the wheel and returns everything that fired.
    pub async fn wait_for_timers(&mut self) -> Vec<TimerHandle> {
        let now = self.now_ms();
        match self.wheel.next_due_at() {
            Some(due_ms) if due_ms > now => {
                sleep(Duration::from_millis(due_ms - now)).await;
            }
            Some(_) => {}
            None => std::future::pending::<()>().await,
        }
        let now = self.now_ms();
        self.wheel.advance_to(now)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
