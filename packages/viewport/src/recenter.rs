//! Debounced snap-back to the user's location after a manual pan.
//!
//! The timer is a pure state machine driven by caller-supplied instants, so
//! it can sit behind any event loop. Callers poll before delivering a new
//! pan so an overdue recenter fires instead of being rescheduled.

use std::time::{Duration, Instant};

use cycle_parking_models::GeoPoint;

/// Default wait between the last manual pan and the recenter.
pub const RECENTER_DELAY: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecenterState {
    Idle,
    Pending { deadline: Instant },
    /// The last pending recenter fired; waits for the next pan.
    Fired,
}

/// State change produced by a timer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecenterTransition {
    /// A recenter was armed from idle.
    Scheduled { deadline: Instant },
    /// A pending recenter was cancelled and a new one armed.
    Rescheduled { deadline: Instant },
    /// The deadline passed; recenter now.
    Fired,
    /// A pending recenter was dropped without firing.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RecenterTimer {
    state: RecenterState,
    delay: Duration,
}

impl Default for RecenterTimer {
    fn default() -> Self {
        Self::new(RECENTER_DELAY)
    }
}

impl RecenterTimer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            state: RecenterState::Idle,
            delay,
        }
    }

    #[must_use]
    pub const fn state(&self) -> RecenterState {
        self.state
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, RecenterState::Pending { .. })
    }

    /// Arms the timer for `now + delay`, replacing any pending deadline.
    pub fn on_manual_pan(&mut self, now: Instant) -> RecenterTransition {
        let deadline = now + self.delay;
        let was_pending = self.is_pending();
        self.state = RecenterState::Pending { deadline };

        if was_pending {
            RecenterTransition::Rescheduled { deadline }
        } else {
            RecenterTransition::Scheduled { deadline }
        }
    }

    /// Fires if the deadline has been reached.
    pub fn poll(&mut self, now: Instant) -> Option<RecenterTransition> {
        match self.state {
            RecenterState::Pending { deadline } if now >= deadline => {
                self.state = RecenterState::Fired;
                Some(RecenterTransition::Fired)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) -> Option<RecenterTransition> {
        if self.is_pending() {
            self.state = RecenterState::Idle;
            Some(RecenterTransition::Cancelled)
        } else {
            None
        }
    }

    /// Time left before the pending recenter fires, for scheduling a wakeup.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            RecenterState::Pending { deadline } => Some(deadline.saturating_duration_since(now)),
            RecenterState::Idle | RecenterState::Fired => None,
        }
    }
}

/// Tracks the user's location and decides when to move the map back to it.
#[derive(Debug, Clone, Default)]
pub struct RecenterController {
    timer: RecenterTimer,
    user_location: Option<GeoPoint>,
}

impl RecenterController {
    #[must_use]
    pub const fn new(timer: RecenterTimer) -> Self {
        Self {
            timer,
            user_location: None,
        }
    }

    #[must_use]
    pub const fn timer(&self) -> &RecenterTimer {
        &self.timer
    }

    #[must_use]
    pub const fn user_location(&self) -> Option<GeoPoint> {
        self.user_location
    }

    /// Records a fix from the location provider.
    pub fn update_user_location(&mut self, point: GeoPoint) {
        self.user_location = Some(point);
    }

    pub fn on_manual_pan(&mut self, now: Instant) -> RecenterTransition {
        self.timer.on_manual_pan(now)
    }

    /// Returns the point to recenter on when the timer fires.
    ///
    /// Without a known user location the timer still fires but nothing is
    /// returned.
    pub fn poll(&mut self, now: Instant) -> Option<GeoPoint> {
        self.timer.poll(now)?;

        if self.user_location.is_none() {
            log::debug!("Recenter fired with no user location");
        }
        self.user_location
    }
}
