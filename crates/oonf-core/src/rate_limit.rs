//! Per-target rate-limited logging (spec.md §9 design note, exercised by
//! scenario S6): a small structure per source holds a monotonic window
//! start and a counter; once the threshold is crossed within the window,
//! further events are suppressed and counted until the window rolls over,
//! at which point the suppressed count is reported in a single summary.

#[derive(Debug, Clone)]
pub struct RateLimiter {
    window_ms: u64,
    threshold: u32,
    window_start_ms: Option<u64>,
    count_in_window: u32,
    suppressed_in_window: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Log it; this is the `nth` event admitted in the current window.
    Admit { nth: u32 },
    /// Don't log individually; it has been folded into the running
    /// suppressed count for this window.
    Suppress,
    /// The window just rolled over with `suppressed` events folded into
    /// the previous window; log one summary line, then this event itself
    /// is the first admitted event of the new window.
    SummarizeThenAdmit { suppressed: u32 },
}

impl RateLimiter {
    /// `threshold` events are admitted per `window_ms`; the `(threshold +
    /// 1)`th event onward in the same window is suppressed. spec.md §4.2
    /// uses threshold=10, window=60_000ms.
    pub fn new(threshold: u32, window_ms: u64) -> Self {
        Self {
            window_ms,
            threshold,
            window_start_ms: None,
            count_in_window: 0,
            suppressed_in_window: 0,
        }
    }

    pub fn per_minute(threshold: u32) -> Self {
        Self::new(threshold, 60_000)
    }

    pub fn record(&mut self, now_ms: u64) -> Admission {
        let window_start = match self.window_start_ms {
            Some(start) if now_ms.saturating_sub(start) < self.window_ms => start,
            _ => {
                let prior_suppressed = self.suppressed_in_window;
                self.window_start_ms = Some(now_ms);
                self.count_in_window = 0;
                self.suppressed_in_window = 0;
                if prior_suppressed > 0 {
                    self.count_in_window = 1;
                    return Admission::SummarizeThenAdmit {
                        suppressed: prior_suppressed,
                    };
                }
                now_ms
            }
        };
        let _ = window_start;

        self.count_in_window += 1;
        if self.count_in_window <= self.threshold {
            Admission::Admit {
                nth: self.count_in_window,
            }
        } else {
            self.suppressed_in_window += 1;
            Admission::Suppress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_threshold_then_suppresses() {
        let mut rl = RateLimiter::new(10, 60_000);
        for i in 1..=10u32 {
            assert_eq!(rl.record(0), Admission::Admit { nth: i });
        }
        assert_eq!(rl.record(100), Admission::Suppress);
        assert_eq!(rl.record(200), Admission::Suppress);
    }

    #[test]
    fn window_rollover_summarizes_suppressed_count() {
        let mut rl = RateLimiter::new(2, 1_000);
        assert_eq!(rl.record(0), Admission::Admit { nth: 1 });
        assert_eq!(rl.record(0), Admission::Admit { nth: 2 });
        assert_eq!(rl.record(0), Admission::Suppress);
        assert_eq!(rl.record(0), Admission::Suppress);

        assert_eq!(
            rl.record(1_500),
            Admission::SummarizeThenAdmit { suppressed: 2 }
        );
        assert_eq!(rl.record(1_500), Admission::Admit { nth: 2 });
    }
}
