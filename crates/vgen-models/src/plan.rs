//! Plan tiers and the monthly generation quota.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Videos a free-tier user may generate per calendar month.
pub const DEFAULT_FREE_MONTHLY_LIMIT: u32 = 3;

/// Plan tier enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
}

impl PlanTier {
    /// Parse from string (case-insensitive). Unknown tiers are treated as free.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pro" => PlanTier::Pro,
            _ => PlanTier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, PlanTier::Free)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether a user may start another generation this month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    free_monthly_limit: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_MONTHLY_LIMIT)
    }
}

impl QuotaPolicy {
    pub fn new(free_monthly_limit: u32) -> Self {
        Self { free_monthly_limit }
    }

    /// Monthly limit for a tier. `None` means unlimited.
    pub fn monthly_limit(&self, tier: PlanTier) -> Option<u32> {
        match tier {
            PlanTier::Free => Some(self.free_monthly_limit),
            PlanTier::Pro => None,
        }
    }

    pub fn is_allowed(&self, tier: PlanTier, videos_this_month: u32) -> bool {
        match self.monthly_limit(tier) {
            Some(limit) => videos_this_month < limit,
            None => true,
        }
    }

    /// Generations left this month. `None` means unlimited.
    pub fn remaining(&self, tier: PlanTier, videos_this_month: u32) -> Option<u32> {
        self.monthly_limit(tier)
            .map(|limit| limit.saturating_sub(videos_this_month))
    }
}

/// Calendar month in UTC as a half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    /// The month containing `now`.
    pub fn containing(now: DateTime<Utc>) -> Self {
        let first = now.date_naive() - Days::new(u64::from(now.day0()));
        Self {
            start: midnight(first),
            end: midnight(first + Months::new(1)),
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// `YYYY-MM` label used in usage responses.
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_plan_tier_parse() {
        assert_eq!(PlanTier::from_str("pro"), PlanTier::Pro);
        assert_eq!(PlanTier::from_str(" PRO "), PlanTier::Pro);
        assert_eq!(PlanTier::from_str("free"), PlanTier::Free);
        assert_eq!(PlanTier::from_str("enterprise"), PlanTier::Free);
        assert_eq!(PlanTier::from_str(""), PlanTier::Free);
    }

    #[test]
    fn test_free_quota_boundary() {
        let policy = QuotaPolicy::default();
        assert!(policy.is_allowed(PlanTier::Free, 0));
        assert!(policy.is_allowed(PlanTier::Free, DEFAULT_FREE_MONTHLY_LIMIT - 1));
        assert!(!policy.is_allowed(PlanTier::Free, DEFAULT_FREE_MONTHLY_LIMIT));
        assert!(!policy.is_allowed(PlanTier::Free, DEFAULT_FREE_MONTHLY_LIMIT + 5));
    }

    #[test]
    fn test_pro_is_unlimited() {
        let policy = QuotaPolicy::new(1);
        assert!(policy.is_allowed(PlanTier::Pro, 0));
        assert!(policy.is_allowed(PlanTier::Pro, 10_000));
        assert_eq!(policy.monthly_limit(PlanTier::Pro), None);
        assert_eq!(policy.remaining(PlanTier::Pro, 50), None);
    }

    #[test]
    fn test_remaining_saturates() {
        let policy = QuotaPolicy::new(3);
        assert_eq!(policy.remaining(PlanTier::Free, 1), Some(2));
        assert_eq!(policy.remaining(PlanTier::Free, 7), Some(0));
    }

    #[test]
    fn test_month_window_bounds() {
        let window = MonthWindow::containing(at(2024, 3, 15, 12));
        assert_eq!(window.start, at(2024, 3, 1, 0));
        assert_eq!(window.end, at(2024, 4, 1, 0));
        assert_eq!(window.label(), "2024-03");
    }

    #[test]
    fn test_month_window_excludes_previous_month() {
        let window = MonthWindow::containing(at(2024, 3, 15, 12));
        assert!(!window.contains(at(2024, 2, 29, 23)));
        assert!(window.contains(at(2024, 3, 1, 0)));
        assert!(!window.contains(at(2024, 4, 1, 0)));
    }

    #[test]
    fn test_month_window_same_month_other_year() {
        let window = MonthWindow::containing(at(2024, 3, 15, 12));
        assert!(!window.contains(at(2023, 3, 15, 12)));
        assert!(!window.contains(at(2025, 3, 2, 0)));
    }

    #[test]
    fn test_month_window_december_rollover() {
        let window = MonthWindow::containing(at(2024, 12, 31, 23));
        assert_eq!(window.start, at(2024, 12, 1, 0));
        assert_eq!(window.end, at(2025, 1, 1, 0));
    }
}
