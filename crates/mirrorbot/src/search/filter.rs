//! Retention rule: recently pushed, or popular enough to keep anyway.

use chrono::{DateTime, Duration, Utc};

use super::CandidateRepo;

/// Length of a "month" in the inactivity window.
pub const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Longest gap since the last push for a repository to count as active.
    pub max_inactive: Duration,
    /// Inactive repositories with at least this many stars are kept.
    pub min_stars_for_stale: u32,
}

impl RetentionPolicy {
    pub fn new(max_inactive: Duration, min_stars_for_stale: u32) -> Self {
        Self {
            max_inactive,
            min_stars_for_stale,
        }
    }

    /// Window expressed in 30-day months, as the configuration does.
    pub fn from_months(months: u32, min_stars_for_stale: u32) -> Self {
        Self::new(
            Duration::days(i64::from(months) * DAYS_PER_MONTH),
            min_stars_for_stale,
        )
    }

    /// Keep if `now - pushed_at <= max_inactive` or `stars >= min_stars_for_stale`.
    ///
    /// A repository that was never pushed only passes on stars.
    pub fn should_keep(
        &self,
        pushed_at: Option<DateTime<Utc>>,
        stars: u32,
        now: DateTime<Utc>,
    ) -> bool {
        let active = pushed_at
            .map(|pushed| now - pushed <= self.max_inactive)
            .unwrap_or(false);
        active || stars >= self.min_stars_for_stale
    }

    pub fn keeps(&self, repo: &CandidateRepo, now: DateTime<Utc>) -> bool {
        self.should_keep(repo.pushed_at, repo.stars, now)
    }
}
