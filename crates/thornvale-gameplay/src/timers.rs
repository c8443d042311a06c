//! Simulation clock and per-actor timers.
//!
//! Every timed routine (wind-up, recovery, provocation, mercy, dash, wall-jump
//! lock) is an explicit deadline checked against [`SimClock::now`] each tick.
//! Time is derived from the tick count so long runs do not accumulate drift.

use serde::{Deserialize, Serialize};

/// Simulation time in seconds.
pub type Seconds = f32;

/// Default fixed step (64 Hz).
pub const DEFAULT_TICK: Seconds = 1.0 / 64.0;

/// Monotonic fixed-step simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Number of ticks advanced so far
    tick: u64,
    /// Fixed step length in seconds
    dt: Seconds,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl SimClock {
    /// Creates a clock with the given fixed step.
    #[must_use]
    pub fn new(dt: Seconds) -> Self {
        Self {
            tick: 0,
            dt: dt.max(1e-4),
        }
    }

    /// Advances one tick and returns the new time.
    pub fn advance(&mut self) -> Seconds {
        self.tick += 1;
        self.now()
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> Seconds {
        (self.tick as f64 * f64::from(self.dt)) as f32
    }

    /// Fixed step length.
    #[must_use]
    pub const fn dt(&self) -> Seconds {
        self.dt
    }

    /// Number of ticks advanced.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

/// A one-shot deadline started at a point in simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Timer {
    /// Start time, `None` while idle
    started_at: Option<Seconds>,
    /// Duration of the window
    duration: Seconds,
}

impl Timer {
    /// An idle timer.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            started_at: None,
            duration: 0.0,
        }
    }

    /// Starts (or restarts) the timer.
    pub fn start(&mut self, now: Seconds, duration: Seconds) {
        self.started_at = Some(now);
        self.duration = duration.max(0.0);
    }

    /// Stops the timer without finishing it.
    pub fn cancel(&mut self) {
        self.started_at = None;
    }

    /// True once started, until cancelled.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// True while started and the deadline has not been reached.
    #[must_use]
    pub fn is_running(&self, now: Seconds) -> bool {
        self.ends_at().is_some_and(|end| now < end)
    }

    /// True once the deadline has been reached.
    #[must_use]
    pub fn is_finished(&self, now: Seconds) -> bool {
        self.ends_at().is_some_and(|end| now >= end)
    }

    /// Returns true exactly once when the deadline is reached, then goes idle.
    pub fn take_finished(&mut self, now: Seconds) -> bool {
        if self.is_finished(now) {
            self.started_at = None;
            true
        } else {
            false
        }
    }

    /// Time the window ends, if started.
    #[must_use]
    pub fn ends_at(&self) -> Option<Seconds> {
        self.started_at.map(|start| start + self.duration)
    }

    /// Time the window started, if started.
    #[must_use]
    pub const fn started_at(&self) -> Option<Seconds> {
        self.started_at
    }

    /// Seconds left until the deadline (zero when idle or finished).
    #[must_use]
    pub fn remaining(&self, now: Seconds) -> Seconds {
        self.ends_at().map_or(0.0, |end| (end - now).max(0.0))
    }
}

/// Earliest time an action may fire again.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cooldown {
    ready_at: Seconds,
}

impl Cooldown {
    /// A cooldown that is ready immediately.
    #[must_use]
    pub const fn ready() -> Self {
        Self { ready_at: 0.0 }
    }

    /// True if the action may fire at `now`.
    #[must_use]
    pub fn is_ready(&self, now: Seconds) -> bool {
        now >= self.ready_at
    }

    /// Blocks the action until `now + duration`.
    pub fn trigger(&mut self, now: Seconds, duration: Seconds) {
        self.ready_at = now + duration.max(0.0);
    }

    /// Time the action becomes ready.
    #[must_use]
    pub const fn ready_at(&self) -> Seconds {
        self.ready_at
    }

    /// Makes the action ready immediately.
    pub fn reset(&mut self) {
        self.ready_at = 0.0;
    }
}

/// On/off state of a blink that toggles every `interval` since `started_at`.
#[must_use]
pub fn blink_phase(started_at: Seconds, now: Seconds, interval: Seconds) -> bool {
    if interval <= 0.0 || now < started_at {
        return false;
    }
    ((now - started_at) / interval).floor() as u64 % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_has_no_drift() {
        let mut clock = SimClock::new(1.0 / 64.0);
        for _ in 0..128 {
            clock.advance();
        }
        assert_eq!(clock.now(), 2.0);
        assert_eq!(clock.tick(), 128);
    }

    #[test]
    fn test_timer_lifecycle() {
        let mut timer = Timer::idle();
        assert!(!timer.is_running(0.0));
        assert!(!timer.is_finished(0.0));

        timer.start(1.0, 0.5);
        assert!(timer.is_running(1.2));
        assert!(!timer.is_finished(1.2));
        assert!((timer.remaining(1.2) - 0.3).abs() < 1e-6);
        assert!(timer.is_finished(1.5));

        assert!(timer.take_finished(1.5));
        assert!(!timer.take_finished(1.6));
        assert!(!timer.is_started());
    }

    #[test]
    fn test_timer_cancel() {
        let mut timer = Timer::idle();
        timer.start(0.0, 1.0);
        timer.cancel();
        assert!(!timer.is_running(0.5));
        assert!(!timer.is_finished(2.0));
    }

    #[test]
    fn test_cooldown() {
        let mut cooldown = Cooldown::ready();
        assert!(cooldown.is_ready(0.0));
        cooldown.trigger(1.0, 0.5);
        assert!(!cooldown.is_ready(1.4));
        assert!(cooldown.is_ready(1.5));
    }

    #[test]
    fn test_blink_phase_toggles() {
        assert!(blink_phase(0.0, 0.05, 0.1));
        assert!(!blink_phase(0.0, 0.15, 0.1));
        assert!(blink_phase(0.0, 0.25, 0.1));
        assert!(!blink_phase(0.0, 0.25, 0.0));
    }
}
