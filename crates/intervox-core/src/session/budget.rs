//! Wall-clock time budget and the pacing tri-state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Tri-state pacing signal: is there enough time left for another full
/// exchange?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordability {
    /// Remaining time exceeds roughly 3x the estimated exchange cost.
    Comfortable,
    /// Positive remaining time, but below the comfortable threshold.
    Tight,
    /// At or below zero; no new questions may be issued.
    Exhausted,
}

/// Shrinking time budget for one session.
///
/// Remaining time is always recomputed from `started_at + duration - now`,
/// never decremented incrementally, so suspended I/O cannot cause drift.
/// Reported values are floor-clamped so `remaining()` is monotonically
/// non-increasing even if the wall clock steps backwards.
#[derive(Debug)]
pub struct TimeBudget {
    started_at: DateTime<Utc>,
    duration_secs: u64,
    reported_floor: AtomicU64,
}

impl TimeBudget {
    pub fn new(started_at: DateTime<Utc>, duration_secs: u64) -> Self {
        Self {
            started_at,
            duration_secs,
            reported_floor: AtomicU64::new(duration_secs),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Remaining seconds as of `now`.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = now.signed_duration_since(self.started_at).num_seconds();
        let raw = if elapsed < 0 {
            self.duration_secs
        } else {
            self.duration_secs.saturating_sub(elapsed as u64)
        };
        // fetch_min both clamps and persists the new floor
        let prior = self.reported_floor.fetch_min(raw, Ordering::Relaxed);
        prior.min(raw)
    }

    /// Remaining seconds as of the current wall clock.
    pub fn remaining(&self) -> u64 {
        self.remaining_at(Utc::now())
    }

    /// Pacing signal for an exchange with the given estimated cost.
    pub fn affordability_at(&self, now: DateTime<Utc>, exchange_cost_secs: u64) -> Affordability {
        let remaining = self.remaining_at(now);
        if remaining == 0 {
            Affordability::Exhausted
        } else if remaining > exchange_cost_secs.saturating_mul(3) {
            Affordability::Comfortable
        } else {
            Affordability::Tight
        }
    }

    pub fn affordability(&self, exchange_cost_secs: u64) -> Affordability {
        self.affordability_at(Utc::now(), exchange_cost_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn remaining_is_recomputed_from_wall_clock() {
        let start = Utc::now();
        let budget = TimeBudget::new(start, 600);
        assert_eq!(budget.remaining_at(start + Duration::seconds(100)), 500);
        assert_eq!(budget.remaining_at(start + Duration::seconds(700)), 0);
    }

    #[test]
    fn remaining_is_monotonically_non_increasing() {
        let start = Utc::now();
        let budget = TimeBudget::new(start, 600);
        assert_eq!(budget.remaining_at(start + Duration::seconds(200)), 400);
        // clock stepping backwards must not inflate the budget
        assert_eq!(budget.remaining_at(start + Duration::seconds(100)), 400);
        assert_eq!(budget.remaining_at(start + Duration::seconds(300)), 300);
    }

    #[test]
    fn affordability_thresholds() {
        let start = Utc::now();
        let budget = TimeBudget::new(start, 600);
        // 600s remaining > 3 * 90s
        assert_eq!(
            budget.affordability_at(start, 90),
            Affordability::Comfortable
        );
        // 200s remaining < 270s
        assert_eq!(
            budget.affordability_at(start + Duration::seconds(400), 90),
            Affordability::Tight
        );
        assert_eq!(
            budget.affordability_at(start + Duration::seconds(600), 90),
            Affordability::Exhausted
        );
    }
}
