/// Quiet-period timer for folder change signals
///
/// Every signal pushes the deadline out by `delay`, so a burst of events
/// fires once, `delay` after the last of them. The timer holds no thread or
/// task; the caller asks it what the deadline is and whether it has passed.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    /// First signal of the pending burst
    burst_start: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            burst_start: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a signal at `now`, (re)starting the quiet period
    pub fn signal(&mut self, now: Instant) {
        self.burst_start.get_or_insert(now);
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire if the quiet period is over
    ///
    /// Returns the start of the burst that just completed and disarms the
    /// timer. Returns `None` while still waiting or when nothing is pending.
    pub fn due(&mut self, now: Instant) -> Option<Instant> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.burst_start.take()
            }
            _ => None,
        }
    }

    /// Push the deadline out without starting a new burst
    pub fn postpone(&mut self, now: Instant) {
        if self.deadline.is_some() {
            self.deadline = Some(now + self.delay);
        }
    }

    pub fn reset(&mut self) {
        self.deadline = None;
        self.burst_start = None;
    }
}
