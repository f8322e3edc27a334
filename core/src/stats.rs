//! Aggregates shown on driver and customer dashboards.

use crate::lifecycle::OrderStatus;
use crate::order::Order;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Order counts for a driver's dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriverDashboard {
    /// Every order ever assigned.
    pub total_orders: usize,
    /// Assigned orders not yet in a terminal state.
    pub active_orders: usize,
    /// Delivered orders.
    pub completed_orders: usize,
    /// Cancelled orders.
    pub cancelled_orders: usize,
}

impl DriverDashboard {
    /// Count a driver's assigned orders.
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        orders.iter().fold(Self::default(), |mut acc, order| {
            acc.total_orders += 1;
            match order.status {
                OrderStatus::Delivered => acc.completed_orders += 1,
                OrderStatus::Cancelled => acc.cancelled_orders += 1,
                _ => acc.active_orders += 1,
            }
            acc
        })
    }
}

/// Delivery performance of a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    /// Delivered orders.
    pub total_deliveries: usize,
    /// Every order ever assigned.
    pub total_assigned_orders: usize,
    /// `delivered / assigned` as a percentage, two decimals.
    pub completion_rate: f64,
    /// Mean minutes from assignment to delivery; `None` without data.
    pub average_delivery_minutes: Option<i64>,
}

impl PerformanceStats {
    /// Compute from a driver's assigned orders.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // order counts stay far below 2^52
    pub fn from_orders(orders: &[Order]) -> Self {
        let delivered: Vec<&Order> = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .collect();

        let completion_rate = if orders.is_empty() {
            0.0
        } else {
            ((delivered.len() as f64 / orders.len() as f64) * 10_000.0).round() / 100.0
        };

        let durations: Vec<i64> = delivered
            .iter()
            .filter_map(|o| {
                let assigned = o.milestones.assigned_at?;
                let done = o.milestones.delivered_at?;
                Some((done - assigned).num_minutes())
            })
            .collect();
        let average_delivery_minutes = i64::try_from(durations.len())
            .ok()
            .filter(|count| *count > 0)
            .map(|count| {
                let sum: i64 = durations.iter().sum();
                (sum as f64 / count as f64).round() as i64
            });

        Self {
            total_deliveries: delivered.len(),
            total_assigned_orders: orders.len(),
            completion_rate,
            average_delivery_minutes,
        }
    }
}

/// A driver's results for the current week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyPerformance {
    /// Monday of the week.
    pub week_start: NaiveDate,
    /// Sunday of the week.
    pub week_end: NaiveDate,
    /// Orders created this week.
    pub total_orders: usize,
    /// Of those, delivered.
    pub delivered_orders: usize,
    /// Of those, cancelled.
    pub cancelled_orders: usize,
}

impl WeeklyPerformance {
    /// Count `orders`, which must already be limited to the week.
    #[must_use]
    pub fn from_orders(week_start: NaiveDate, orders: &[Order]) -> Self {
        let count = |status| orders.iter().filter(|o| o.status == status).count();
        Self {
            week_start,
            week_end: week_start + Days::new(6),
            total_orders: orders.len(),
            delivered_orders: count(OrderStatus::Delivered),
            cancelled_orders: count(OrderStatus::Cancelled),
        }
    }
}

/// A customer's water-tank ordering summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WaterTankStats {
    /// All water-tank orders.
    pub total_orders: usize,
    /// Still pending.
    pub pending_orders: usize,
    /// Delivered.
    pub delivered_orders: usize,
    /// Sum of delivered order totals.
    pub total_spent: Decimal,
}

impl WaterTankStats {
    /// Compute from a customer's water-tank orders.
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        orders.iter().fold(Self::default(), |mut acc, order| {
            acc.total_orders += 1;
            match order.status {
                OrderStatus::Pending => acc.pending_orders += 1,
                OrderStatus::Delivered => {
                    acc.delivered_orders += 1;
                    acc.total_spent += order.total;
                }
                _ => {}
            }
            acc
        })
    }
}

/// Midnight UTC at the start of `now`'s day and of the following day.
#[must_use]
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

/// Monday of the ISO week containing `now`.
#[must_use]
pub fn week_start(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today - Days::new(u64::from(today.weekday().num_days_from_monday()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn week_starts_on_monday() {
        // 2025-01-01 is a Wednesday
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 15, 30, 0).unwrap();
        assert_eq!(week_start(now), NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
    }

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 0).unwrap();
        let (start, end) = day_bounds(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn empty_inputs_produce_zeroes() {
        let perf = PerformanceStats::from_orders(&[]);
        assert!(perf.completion_rate.abs() < f64::EPSILON);
        assert_eq!(perf.average_delivery_minutes, None);
        assert_eq!(DriverDashboard::from_orders(&[]), DriverDashboard::default());
        assert_eq!(WaterTankStats::from_orders(&[]), WaterTankStats::default());
    }
}
