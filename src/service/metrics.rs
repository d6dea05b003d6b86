//! Dashboard aggregates computed over an owner's appointment list.

use crate::db::{Appointment, AppointmentStatus};
use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A calendar month in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    first_day: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first_day| Self { first_day })
    }

    pub fn containing(ts: DateTime<Utc>) -> Self {
        Self {
            first_day: ts.date_naive().with_day(1).unwrap_or(ts.date_naive()),
        }
    }

    /// Parse `YYYY-MM`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (y, m) = raw.trim().split_once('-')?;
        Self::new(y.parse().ok()?, m.parse().ok()?)
    }

    pub fn label(&self) -> String {
        self.first_day.format("%Y-%m").to_string()
    }

    pub fn previous(&self, n: u32) -> Self {
        Self {
            first_day: self
                .first_day
                .checked_sub_months(Months::new(n))
                .unwrap_or(self.first_day),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        Self::containing(ts) == *self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMetrics {
    pub month: String,
    pub new_contacts: usize,
    pub completed: usize,
    pub revenue: f64,
    pub goal: u32,
    pub goal_progress: f64,
}

/// Appointments created in `month`, how many of those were completed, and
/// what they brought in.
pub fn monthly_metrics(appointments: &[Appointment], month: YearMonth, goal: u32) -> MonthlyMetrics {
    let created: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| month.contains(a.created_at))
        .collect();
    let completed: Vec<&&Appointment> = created
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .collect();
    let revenue = completed.iter().filter_map(|a| a.charged_price).sum();

    MonthlyMetrics {
        month: month.label(),
        new_contacts: created.len(),
        completed: completed.len(),
        revenue,
        goal,
        goal_progress: progress(completed.len(), goal),
    }
}

fn progress(done: usize, goal: u32) -> f64 {
    if goal == 0 {
        return 1.0;
    }
    (done as f64 / goal as f64).min(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: String,
    pub completed: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    pub months: Vec<MonthBucket>,
    pub total_completed: usize,
    pub total_revenue: f64,
    pub average_ticket: f64,
    pub scheduled_count: usize,
    /// Completed over all appointments, in percent.
    pub conversion_rate: f64,
}

/// Last `months` months (oldest first, current month last), bucketing
/// completed appointments by the time they were completed.
pub fn history_report(appointments: &[Appointment], now: DateTime<Utc>, months: u32) -> HistoryReport {
    let current = YearMonth::containing(now);
    let completed: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .collect();

    let buckets = (0..months)
        .rev()
        .map(|back| {
            let month = current.previous(back);
            let in_month: Vec<&&Appointment> = completed
                .iter()
                .filter(|a| month.contains(a.updated_at))
                .collect();
            MonthBucket {
                month: month.label(),
                completed: in_month.len(),
                revenue: in_month.iter().filter_map(|a| a.charged_price).sum(),
            }
        })
        .collect();

    let total_completed = completed.len();
    let total_revenue: f64 = completed.iter().filter_map(|a| a.charged_price).sum();
    let scheduled_count = appointments.iter().filter(|a| a.is_scheduled()).count();

    HistoryReport {
        months: buckets,
        total_completed,
        total_revenue,
        average_ticket: if total_completed > 0 {
            total_revenue / total_completed as f64
        } else {
            0.0
        },
        scheduled_count,
        conversion_rate: if appointments.is_empty() {
            0.0
        } else {
            total_completed as f64 / appointments.len() as f64 * 100.0
        },
    }
}

/// Dashboard time windows, all in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    /// ISO week, Monday first.
    Week,
    Month,
}

impl Period {
    pub fn contains(self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let day = ts.date_naive();
        let today = now.date_naive();
        match self {
            Period::Today => day == today,
            Period::Week => {
                let monday = today - TimeDelta::days(today.weekday().num_days_from_monday() as i64);
                day >= monday && day < monday + TimeDelta::days(7)
            }
            Period::Month => YearMonth::containing(ts) == YearMonth::containing(now),
        }
    }
}

/// Keep appointments matching `status` and falling in `period`; undated
/// appointments never match a period.
pub fn filter_view(
    appointments: Vec<Appointment>,
    status: Option<AppointmentStatus>,
    period: Option<Period>,
    now: DateTime<Utc>,
) -> Vec<Appointment> {
    appointments
        .into_iter()
        .filter(|a| status.is_none_or(|s| a.status == s))
        .filter(|a| match period {
            None => true,
            Some(p) => a.scheduled_at.is_some_and(|ts| p.contains(ts, now)),
        })
        .collect()
}
