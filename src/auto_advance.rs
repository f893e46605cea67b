use std::time::Duration;

use tokio::time::Instant;

pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Re-armable periodic trigger for the slideshow.
///
/// The timer only holds a deadline while it is allowed to run: auto-next
/// enabled, an interval set, and the overlay panel closed.
#[derive(Debug, Clone)]
pub struct AutoAdvance {
    enabled: bool,
    interval: Option<Duration>,
    overlay_open: bool,
    deadline: Option<Instant>,
}

impl AutoAdvance {
    pub fn new(enabled: bool, interval: Option<Duration>, now: Instant) -> Self {
        let mut timer = Self {
            enabled,
            interval,
            overlay_open: false,
            deadline: None,
        };
        timer.rearm(now);
        timer
    }

    /// Interval actually used, clamped to [`MIN_INTERVAL`].
    pub fn effective_interval(&self) -> Option<Duration> {
        self.interval.map(|i| i.max(MIN_INTERVAL))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn overlay_open(&self) -> bool {
        self.overlay_open
    }

    /// Clear any pending deadline and start a full interval from `now`.
    pub fn rearm(&mut self, now: Instant) {
        self.deadline = None;
        if !self.enabled || self.overlay_open {
            return;
        }
        if let Some(interval) = self.effective_interval() {
            self.deadline = Some(now + interval);
        }
    }

    pub fn set_interval(&mut self, interval: Option<Duration>, now: Instant) {
        self.interval = interval;
        self.rearm(now);
    }

    pub fn set_enabled(&mut self, enabled: bool, now: Instant) {
        self.enabled = enabled;
        self.rearm(now);
    }

    pub fn set_overlay_open(&mut self, open: bool, now: Instant) {
        self.overlay_open = open;
        self.rearm(now);
    }

    /// Manual navigation gets a fresh interval before the next auto step.
    pub fn on_manual_navigation(&mut self, now: Instant) {
        self.rearm(now);
    }

    /// Returns `true` when the deadline passed; the timer re-arms itself.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.rearm(now);
                true
            }
            _ => false,
        }
    }
}
