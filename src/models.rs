use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates;

pub const DEFAULT_CYCLE_DAYS: u32 = 28;
pub const DEFAULT_MENSTRUAL_DAYS: u32 = 5;

/// Cycle settings exactly as they are persisted under `@cycle_settings`.
///
/// `last_period_date` stays a raw string: older entries hold a full ISO
/// timestamp, newer ones a plain `yyyy-MM-dd` date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleSettings {
    #[serde(default)]
    pub last_period_date: Option<String>,
    #[serde(default = "default_cycle_days")]
    pub cycle_days: u32,
    #[serde(default = "default_menstrual_days")]
    pub menstrual_days: u32,
    #[serde(default)]
    pub notifications_enabled: bool,
}

fn default_cycle_days() -> u32 {
    DEFAULT_CYCLE_DAYS
}

fn default_menstrual_days() -> u32 {
    DEFAULT_MENSTRUAL_DAYS
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            last_period_date: None,
            cycle_days: DEFAULT_CYCLE_DAYS,
            menstrual_days: DEFAULT_MENSTRUAL_DAYS,
            notifications_enabled: false,
        }
    }
}

impl CycleSettings {
    pub fn new(last_period: NaiveDate, cycle_days: u32, menstrual_days: u32) -> Self {
        Self {
            last_period_date: Some(dates::to_iso(last_period)),
            cycle_days,
            menstrual_days,
            notifications_enabled: false,
        }
    }
}

/// Typed cycle configuration consumed by the calculator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleConfiguration {
    pub last_period_start: NaiveDate,
    pub cycle_length_days: u32,
    pub period_length_days: u32,
}

impl CycleConfiguration {
    pub fn new(
        last_period_start: NaiveDate,
        cycle_length_days: u32,
        period_length_days: u32,
    ) -> Self {
        Self {
            last_period_start,
            cycle_length_days,
            period_length_days,
        }
    }

    /// Cycle length used for arithmetic. Never zero.
    pub fn effective_cycle_length(&self) -> i64 {
        i64::from(self.cycle_length_days.max(1))
    }

    /// Move the anchor forward to the most recent logged start, if newer.
    pub fn anchored_to(&self, period_log: &[NaiveDate]) -> Self {
        match period_log.iter().max() {
            Some(&latest) if latest > self.last_period_start => Self {
                last_period_start: latest,
                ..*self
            },
            _ => *self,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Menstruation,
    Follicular,
    Ovulation,
    Luteal,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Menstruation => "menstruation",
            Phase::Follicular => "follicular",
            Phase::Ovulation => "ovulation",
            Phase::Luteal => "luteal",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where "today" sits in the current cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleStatus {
    pub current_day_in_cycle: u32,
    pub phase: Phase,
    pub days_until_next_period: i64,
    pub next_period_date: NaiveDate,
    pub current_cycle_start: NaiveDate,
    pub cycle_length_days: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MarkingCategory {
    LoggedPeriod,
    PredictedPeriod,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FertilityWindow {
    pub fertile_start: NaiveDate,
    pub fertile_end: NaiveDate,
    pub ovulation_day: NaiveDate,
    pub peak_start: NaiveDate,
    pub peak_end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleStats {
    pub total_cycles: usize,
    pub avg_cycle_length: Option<f32>,
    pub shortest_cycle: Option<i64>,
    pub longest_cycle: Option<i64>,
    pub last_period_start: Option<NaiveDate>,
}

/// Reminder toggles persisted under `@notification_settings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettings {
    #[serde(default)]
    pub enable_all: bool,
    #[serde(default)]
    pub menstrual_reminder: bool,
    #[serde(default)]
    pub ovulation_reminder: bool,
    #[serde(default)]
    pub ovulation_day_reminder: bool,
    #[serde(default)]
    pub ovulation_end_reminder: bool,
    #[serde(default = "default_reminder_time")]
    pub reminder_time: NaiveTime,
}

fn default_reminder_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enable_all: false,
            menstrual_reminder: false,
            ovulation_reminder: false,
            ovulation_day_reminder: false,
            ovulation_end_reminder: false,
            reminder_time: default_reminder_time(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReminderKind {
    Menstrual,
    Ovulation,
    OvulationDay,
    OvulationEnd,
}

impl ReminderKind {
    pub fn message(&self) -> &'static str {
        match self {
            ReminderKind::Menstrual => "Your period is expected to start soon",
            ReminderKind::Ovulation => "Your fertile window opens tomorrow",
            ReminderKind::OvulationDay => "Peak fertility starts today",
            ReminderKind::OvulationEnd => "Your fertile window ends today",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    pub kind: ReminderKind,
    pub at: chrono::NaiveDateTime,
}

/// How often a medication is due.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    EveryNDays { interval: u32 },
    Weekly { days_of_week: Vec<Weekday> },
    Monthly { day_of_month: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub created_on: NaiveDate,
    #[serde(default)]
    pub taken_on: Vec<NaiveDate>,
}

impl Medication {
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        frequency: Frequency,
        created_on: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dosage: dosage.into(),
            frequency,
            created_on,
            taken_on: Vec::new(),
        }
    }
}
