//! Timers for the Keynes room actor.
//!
//! Two timers, both meant to sit in a room actor's `tokio::select!` loop
//! next to the command channel:
//!
//! - [`Countdown`] fires once per interval while running. The room uses
//!   it for the one-second round clock.
//! - [`Alarm`] fires once at a deadline and hands back a payload. The
//!   room uses it for the delayed phase changes (rule intro, results).
//!
//! # Idle timers pend forever
//!
//! A stopped countdown or a disarmed alarm never resolves, so the
//! `select!` branch simply never wins. Starting, stopping, arming and
//! disarming all happen between `select!` iterations on `&mut self`,
//! which makes a cancelled timer unable to fire late.
//!
//! # Cancel safety
//!
//! Both `wait` methods only touch state after their sleep completes, so
//! dropping the future when another branch wins loses nothing.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = countdown.wait_for_tick() => { /* timer -= 1 */ }
//!         step = alarm.wait() => { /* advance phase */ }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// A cancellable periodic ticker.
///
/// Created stopped. [`start`](Self::start) schedules the first tick one
/// interval from now; later ticks keep the original cadence rather than
/// drifting with handler time.
#[derive(Debug)]
pub struct Countdown {
    interval: Duration,
    next_tick: Option<Instant>,
    tick_count: u64,
}

impl Countdown {
    /// Shortest interval accepted. Anything below is raised to this.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(interval: Duration) -> Self {
        let interval = if interval < Self::MIN_INTERVAL {
            warn!(?interval, min = ?Self::MIN_INTERVAL, "countdown interval too small, clamping");
            Self::MIN_INTERVAL
        } else {
            interval
        };

        Self {
            interval,
            next_tick: None,
            tick_count: 0,
        }
    }

    /// Starts (or restarts) the countdown. The tick counter resets.
    pub fn start(&mut self) {
        self.next_tick = Some(Instant::now() + self.interval);
        self.tick_count = 0;
        debug!(interval = ?self.interval, "countdown started");
    }

    /// Stops the countdown. Idempotent.
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(ticks = self.tick_count, "countdown stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Ticks fired since the last [`start`](Self::start).
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the next tick and returns its number (starting at 1).
    ///
    /// Pends forever while stopped.
    pub async fn wait_for_tick(&mut self) -> u64 {
        let Some(next) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        self.next_tick = Some(if late_by > self.interval {
            // Fell more than a whole tick behind: resume from now instead
            // of firing a burst.
            warn!(
                tick = self.tick_count + 1,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "countdown overrun, skipping ahead"
            );
            now + self.interval
        } else {
            next + self.interval
        });
        self.tick_count += 1;

        trace!(tick = self.tick_count, "countdown tick");
        self.tick_count
    }
}

// ---------------------------------------------------------------------------
// Alarm
// ---------------------------------------------------------------------------

/// A one-shot deadline carrying a payload.
///
/// At most one deadline is pending; arming again replaces it.
#[derive(Debug)]
pub struct Alarm<T> {
    armed: Option<(Instant, T)>,
}

impl<T> Default for Alarm<T> {
    fn default() -> Self {
        Self { armed: None }
    }
}

impl<T> Alarm<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `payload` after `after`, replacing any pending deadline.
    pub fn arm(&mut self, after: Duration, payload: T) {
        self.armed = Some((Instant::now() + after, payload));
    }

    /// Cancels the pending deadline and returns its payload, if any.
    pub fn disarm(&mut self) -> Option<T> {
        self.armed.take().map(|(_, payload)| payload)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// When the pending deadline is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(at, _)| *at)
    }

    /// Waits for the deadline and returns the payload. The alarm is
    /// disarmed afterwards.
    ///
    /// Pends forever while disarmed.
    pub async fn wait(&mut self) -> T {
        let Some(deadline) = self.deadline() else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        match self.armed.take() {
            Some((_, payload)) => payload,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_countdown_is_stopped() {
        let c = Countdown::new(Duration::from_secs(1));
        assert!(!c.is_running());
        assert_eq!(c.tick_count(), 0);
        assert_eq!(c.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let c = Countdown::new(Duration::ZERO);
        assert_eq!(c.interval(), Countdown::MIN_INTERVAL);
    }

    #[test]
    fn test_alarm_disarm_returns_payload() {
        let mut a: Alarm<&str> = Alarm::new();
        assert_eq!(a.disarm(), None);

        a.arm(Duration::from_secs(3), "results");
        assert!(a.is_armed());
        assert_eq!(a.disarm(), Some("results"));
        assert!(!a.is_armed());
        assert!(a.deadline().is_none());
    }
}
