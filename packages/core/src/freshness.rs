//! Age-based staleness check for the stored issue set.

use chrono::{DateTime, TimeDelta, Utc};

/// Decides whether cached results may be served without recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessGate {
    window: TimeDelta,
}

impl Default for FreshnessGate {
    fn default() -> Self {
        Self {
            window: TimeDelta::hours(24),
        }
    }
}

impl FreshnessGate {
    pub fn new(window: TimeDelta) -> Self {
        Self { window }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// True iff the newest stored issue is younger than the window.
    ///
    /// An empty store (`None`) is never fresh, so the first read populates it.
    pub fn is_fresh(&self, newest_last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        newest_last_updated.is_some_and(|newest| now - newest < self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn just_inside_window_is_fresh() {
        let now = Utc::now();
        let newest = now - TimeDelta::hours(23) - TimeDelta::minutes(59);
        assert!(FreshnessGate::default().is_fresh(Some(newest), now));
    }

    #[test]
    fn just_outside_window_is_stale() {
        let now = Utc::now();
        let newest = now - TimeDelta::hours(24) - TimeDelta::minutes(1);
        assert!(!FreshnessGate::default().is_fresh(Some(newest), now));
    }

    #[test]
    fn exactly_at_window_is_stale() {
        let now = Utc::now();
        assert!(!FreshnessGate::default().is_fresh(Some(now - TimeDelta::hours(24)), now));
    }

    #[test]
    fn empty_store_is_stale() {
        assert!(!FreshnessGate::default().is_fresh(None, Utc::now()));
    }

    #[test]
    fn custom_window() {
        let gate = FreshnessGate::new(TimeDelta::minutes(5));
        let now = Utc::now();
        assert!(gate.is_fresh(Some(now - TimeDelta::minutes(4)), now));
        assert!(!gate.is_fresh(Some(now - TimeDelta::minutes(6)), now));
    }
}
