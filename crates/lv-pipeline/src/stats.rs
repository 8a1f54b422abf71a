//! # Dashboard Statistics
//!
//! Aggregates shown above a dashboard list: counts by recency bucket and
//! amount totals, per-group totals, and a month-by-month trend.

use crate::record::{searchable_text, value_timestamp, value_to_f64, Record};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Months covered by the dashboard trend.
pub const DEFAULT_TREND_MONTHS: u32 = 6;

/// Recency bucket behind a statistics card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Today,
    ThisWeek,
    ThisMonth,
}

impl Bucket {
    /// First day of the bucket containing `today`. Weeks start on Sunday.
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Today => today,
            Self::ThisWeek => {
                today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
            }
            Self::ThisMonth => today.with_day(1).unwrap_or(today),
        }
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "today" => Ok(Self::Today),
            "this_week" | "week" => Ok(Self::ThisWeek),
            "this_month" | "month" => Ok(Self::ThisMonth),
            other => Err(format!(
                "unknown bucket '{}' (expected today, this_week or this_month)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
    pub this_month: usize,
    pub total_amount: f64,
    pub average_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    /// Group label; `None` for records without a value.
    pub key: Option<String>,
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
}

fn record_date(record: &Record, field: &str) -> Option<NaiveDate> {
    let ts = value_timestamp(record.value(field)?)?;
    DateTime::from_timestamp_millis(ts).map(|dt| dt.date_naive())
}

fn amount_of(record: &Record, field: &str) -> f64 {
    record.value(field).and_then(value_to_f64).unwrap_or(0.0)
}

/// Compute statistics relative to `today`. Weeks start on Sunday. Records
/// without a parseable date only count toward `total` and the amounts.
pub fn compute(
    records: &[Record],
    date_field: &str,
    amount_field: &str,
    today: NaiveDate,
) -> DashboardStats {
    let week_start = Bucket::ThisWeek.start(today);
    let month_start = Bucket::ThisMonth.start(today);

    let mut stats = DashboardStats {
        total: records.len(),
        today: 0,
        this_week: 0,
        this_month: 0,
        total_amount: 0.0,
        average_amount: 0.0,
    };

    for record in records {
        stats.total_amount += amount_of(record, amount_field);
        if let Some(date) = record_date(record, date_field) {
            if date >= today {
                stats.today += 1;
            }
            if date >= week_start {
                stats.this_week += 1;
            }
            if date >= month_start {
                stats.this_month += 1;
            }
        }
    }

    if !records.is_empty() {
        stats.average_amount = stats.total_amount / records.len() as f64;
    }
    stats
}

/// Count and amount per distinct value of `group_field`, in first-seen order.
pub fn group_totals(records: &[Record], group_field: &str, amount_field: &str) -> Vec<GroupTotal> {
    let mut groups: Vec<GroupTotal> = Vec::new();
    for record in records {
        let key = record.value(group_field).and_then(searchable_text);
        let amount = amount_of(record, amount_field);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => {
                group.count += 1;
                group.amount += amount;
            }
            None => groups.push(GroupTotal {
                key,
                count: 1,
                amount,
            }),
        }
    }
    groups
}

/// Records per calendar month for the `months` months ending with the one
/// containing `today`, oldest first. Months without records count zero.
pub fn monthly_counts(
    records: &[Record],
    date_field: &str,
    today: NaiveDate,
    months: u32,
) -> Vec<MonthCount> {
    let current = Bucket::ThisMonth.start(today);
    let starts: Vec<NaiveDate> = (0..months)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect();

    let mut counts = vec![0usize; starts.len()];
    for record in records {
        let Some(date) = record_date(record, date_field) else {
            continue;
        };
        if let Some(slot) = starts
            .iter()
            .position(|s| s.year() == date.year() && s.month() == date.month())
        {
            counts[slot] += 1;
        }
    }

    starts
        .iter()
        .zip(counts)
        .map(|(start, count)| MonthCount {
            month: start.format("%Y-%m").to_string(),
            count,
        })
        .collect()
}
