//! Scheduled transaction model and occurrence projection
//!
//! A ScheduledTransaction is a recurrence rule plus a default amount and
//! target budget. The rule is a tagged variant, so exactly one recurrence
//! kind exists per schedule by construction. Projection expands a rule into
//! concrete fire dates within a closed date range; it never mutates the rule
//! and never persists anything.
//!
//! Calendar edge-case policies (explicit, tested):
//! - day-of-month rules fire on the last day of months too short for the
//!   requested day (day 31 fires Feb 28 in a non-leap February);
//! - annual rules for Feb 29 fire on Feb 28 in non-leap years.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, BudgetId, ScheduleId};
use super::money::Money;

/// Maximum day per month, counting leap-year February
const MONTH_MAX_DAYS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A recurrence rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    /// Fires once per calendar month on the given day (1-31)
    DayOfMonth { day: u32 },
    /// Fires every week on the given weekday (0 = Monday .. 6 = Sunday)
    DayOfWeek { weekday: u8 },
    /// Fires once per year on the given month (1-12) and day (1-31)
    Annual { month: u32, day: u32 },
}

impl Recurrence {
    /// Validate the rule's fields
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::DayOfMonth { day } => {
                if !(1..=31).contains(&day) {
                    return Err(format!("Day of month must be 1-31, got {}", day));
                }
            }
            Self::DayOfWeek { weekday } => {
                if weekday > 6 {
                    return Err(format!("Weekday must be 0-6 (Monday-Sunday), got {}", weekday));
                }
            }
            Self::Annual { month, day } => {
                if !(1..=12).contains(&month) {
                    return Err(format!("Month must be 1-12, got {}", month));
                }
                let max = MONTH_MAX_DAYS[(month - 1) as usize];
                if !(1..=max).contains(&day) {
                    return Err(format!("Day {} is not valid for month {}", day, month));
                }
            }
        }
        Ok(())
    }

    /// Project this rule into concrete dates within `[start, end]`
    ///
    /// The returned iterator is lazy, finite, and cloneable, so a projection
    /// can be restarted or resumed from any point.
    pub fn occurrences(&self, start: NaiveDate, end: NaiveDate) -> Occurrences {
        let upcoming = if start > end {
            None
        } else {
            self.first_on_or_after(start)
        };
        Occurrences {
            rule: *self,
            end,
            upcoming,
        }
    }

    /// First fire date on or after `date`
    fn first_on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Self::DayOfMonth { day } => {
                let fire = fire_in_month(date.year(), date.month(), day)?;
                if fire >= date {
                    Some(fire)
                } else {
                    let (year, month) = next_month(date.year(), date.month());
                    fire_in_month(year, month, day)
                }
            }
            Self::DayOfWeek { weekday } => {
                let today = date.weekday().num_days_from_monday() as u8;
                let offset = i64::from((weekday + 7 - today) % 7);
                date.checked_add_signed(Duration::days(offset))
            }
            Self::Annual { month, day } => {
                let fire = fire_in_year(date.year(), month, day)?;
                if fire >= date {
                    Some(fire)
                } else {
                    fire_in_year(date.year() + 1, month, day)
                }
            }
        }
    }

    /// Fire date following `current`, where `current` was produced by this rule
    fn successor(&self, current: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Self::DayOfMonth { day } => {
                let (year, month) = next_month(current.year(), current.month());
                fire_in_month(year, month, day)
            }
            Self::DayOfWeek { .. } => current.checked_add_signed(Duration::days(7)),
            Self::Annual { month, day } => fire_in_year(current.year() + 1, month, day),
        }
    }

    /// Short human-readable description of the rule
    pub fn description(&self) -> String {
        match *self {
            Self::DayOfMonth { day } => format!("Monthly on day {}", day),
            Self::DayOfWeek { weekday } => {
                const NAMES: [&str; 7] = [
                    "Monday",
                    "Tuesday",
                    "Wednesday",
                    "Thursday",
                    "Friday",
                    "Saturday",
                    "Sunday",
                ];
                format!("Weekly on {}", NAMES[usize::from(weekday.min(6))])
            }
            Self::Annual { month, day } => format!("Yearly on {:02}-{:02}", month, day),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Fire date for a day-of-month rule in a given month, clamped to the last
/// day of months that are too short
fn fire_in_month(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let clamped = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, clamped)
}

/// Fire date for an annual rule in a given year; Feb 29 falls back to Feb 28
/// in non-leap years
fn fire_in_year(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => Some(date),
        None => fire_in_month(year, month, day),
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Lazy, finite, cloneable sequence of fire dates for a recurrence rule
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: Recurrence,
    end: NaiveDate,
    upcoming: Option<NaiveDate>,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let fire = self.upcoming?;
        if fire > self.end {
            self.upcoming = None;
            return None;
        }
        self.upcoming = self.rule.successor(fire);
        Some(fire)
    }
}

/// A recurring transaction rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTransaction {
    /// Unique identifier
    pub id: ScheduleId,

    /// Description copied onto materialized transactions
    pub description: String,

    /// Free-form notes
    #[serde(default)]
    pub notes: String,

    /// Default amount of each occurrence
    pub amount: Money,

    /// Account the occurrences post against
    pub account_id: AccountId,

    /// Budget expected to fund the occurrences
    pub budget_id: BudgetId,

    /// When the rule fires
    pub recurrence: Recurrence,

    /// Whether the rule is enabled; inactive rules project nothing
    #[serde(default = "default_active")]
    pub active: bool,

    /// When the rule was created
    pub created_at: DateTime<Utc>,

    /// When the rule was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl ScheduledTransaction {
    /// Create a new scheduled transaction
    pub fn new(
        description: impl Into<String>,
        amount: Money,
        account_id: AccountId,
        budget_id: BudgetId,
        recurrence: Recurrence,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ScheduleId::new(),
            description: description.into(),
            notes: String::new(),
            amount,
            account_id,
            budget_id,
            recurrence,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Disable the rule
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Re-enable the rule
    pub fn activate(&mut self) {
        self.active = true;
        self.updated_at = Utc::now();
    }

    /// Validate the rule
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("Schedule description cannot be empty".to_string());
        }
        self.recurrence.validate()
    }

    /// Project candidate occurrences within `[start, end]`
    ///
    /// Candidates are unpersisted; materializing one as a real transaction is
    /// the caller's decision. Inactive rules yield nothing.
    pub fn project(&self, start: NaiveDate, end: NaiveDate) -> Projection {
        let dates = if self.active {
            self.recurrence.occurrences(start, end)
        } else {
            Occurrences {
                rule: self.recurrence,
                end,
                upcoming: None,
            }
        };
        Projection {
            dates,
            schedule_id: self.id,
            amount: self.amount,
            account_id: self.account_id,
            budget_id: self.budget_id,
            description: self.description.clone(),
        }
    }
}

impl fmt::Display for ScheduledTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.description, self.amount, self.recurrence)
    }
}

/// A candidate occurrence of a scheduled transaction
///
/// Carries everything needed to materialize a real transaction, but is not
/// itself persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub amount: Money,
    pub account_id: AccountId,
    pub budget_id: BudgetId,
    pub schedule_id: ScheduleId,
    pub description: String,
}

/// Cloneable iterator of candidate occurrences for one schedule
#[derive(Debug, Clone)]
pub struct Projection {
    dates: Occurrences,
    schedule_id: ScheduleId,
    amount: Money,
    account_id: AccountId,
    budget_id: BudgetId,
    description: String,
}

impl Iterator for Projection {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        self.dates.next().map(|date| Occurrence {
            date,
            amount: self.amount,
            account_id: self.account_id,
            budget_id: self.budget_id,
            schedule_id: self.schedule_id,
            description: self.description.clone(),
        })
    }
}
