use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardTotals {
    pub users: u64,
    pub businesses: u64,
    pub products: u64,
    /// Sum of approved payments, in cents.
    pub revenue_cents: i64,
}

/// Month-over-month comparison of one metric.
#[derive(Serialize, Deserialize, Debug, PartialEq, utoipa::ToSchema)]
pub struct Trend {
    pub current: i64,
    pub previous: i64,
    /// Percentage change, one decimal.
    #[schema(example = 12.5)]
    pub percentage: f64,
}

impl Trend {
    pub fn new(current: i64, previous: i64) -> Self {
        Self {
            current,
            previous,
            percentage: trend_percentage(current, previous),
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardTrends {
    pub users: Trend,
    pub businesses: Trend,
    pub products: Trend,
    pub revenue: Trend,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub totals: DashboardTotals,
    pub trends: DashboardTrends,
}

/// `((current - previous) / previous) * 100` rounded to one decimal.
///
/// A zero baseline yields 100 when there is growth and 0 otherwise.
pub fn trend_percentage(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    let pct = (current - previous) as f64 / previous as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Start of the previous calendar month and of the current one, in UTC.
pub fn month_windows(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let current = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()?;
    let (year, month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    let previous = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
    Some((previous, current))
}
