use chrono::{DateTime, Duration, Utc};

/// Cooldown between two counted views of the same portfolio.
pub const VIEW_COOLDOWN_SECS: i64 = 5 * 60;

/// Decides whether a portfolio was counted too recently to count again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyGate {
    window: Duration,
}

impl Default for RecencyGate {
    fn default() -> Self {
        Self { window: Duration::seconds(VIEW_COOLDOWN_SECS) }
    }
}

impl RecencyGate {
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Closed means "do not count": the last counted view is inside the window.
    pub fn is_closed(&self, last_counted: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_counted {
            Some(last) => now - last < self.window,
            None => false,
        }
    }

    /// Latest `view_counted_at` that still leaves the gate open at `now`.
    /// Passed to the store so the check is repeated inside the atomic update.
    pub fn idle_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }
}
