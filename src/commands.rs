use std::ops::RangeInclusive;

use chrono::{Months, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calendar::{self, CalendarMarking};
use crate::clock::Clock;
use crate::dates;
use crate::medication;
use crate::models::*;
use crate::prediction::{self, PeriodOutlook};
use crate::records::{MedicationStore, PeriodLogStore, ReminderSettingsStore, SettingsStore};
use crate::reminders;
use crate::storage::{KeyValueStore, StorageError};

pub const CYCLE_DAYS_RANGE: RangeInclusive<u32> = 21..=35;
pub const MENSTRUAL_DAYS_RANGE: RangeInclusive<u32> = 1..=10;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("cycle length must be between 21 and 35 days, got {0}")]
    InvalidCycleLength(u32),
    #[error("period length must be between 1 and 10 days, got {0}")]
    InvalidPeriodLength(u32),
    #[error("invalid month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Tracker operations over a store and a clock.
///
/// Holds no derived state: every query reads the store and recomputes.
pub struct Tracker<S, C> {
    store: S,
    clock: C,
}

impl<S: KeyValueStore, C: Clock> Tracker<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn settings(&self) -> Result<Option<CycleSettings>, TrackerError> {
        Ok(self.store.cycle_settings()?)
    }

    /// Validate and persist the cycle settings. The notification flag is kept.
    pub fn update_settings(
        &mut self,
        last_period: NaiveDate,
        cycle_days: u32,
        menstrual_days: u32,
    ) -> Result<CycleSettings, TrackerError> {
        if !CYCLE_DAYS_RANGE.contains(&cycle_days) {
            return Err(TrackerError::InvalidCycleLength(cycle_days));
        }
        if !MENSTRUAL_DAYS_RANGE.contains(&menstrual_days) {
            return Err(TrackerError::InvalidPeriodLength(menstrual_days));
        }
        let previous = self.store.cycle_settings()?.unwrap_or_default();
        let settings = CycleSettings {
            notifications_enabled: previous.notifications_enabled,
            ..CycleSettings::new(last_period, cycle_days, menstrual_days)
        };
        self.store.set_cycle_settings(&settings)?;
        info!(%last_period, cycle_days, menstrual_days, "cycle settings updated");
        Ok(settings)
    }

    /// Configuration anchored on the newest logged period, if any is stored.
    pub fn configuration(&self) -> Result<Option<CycleConfiguration>, TrackerError> {
        let Some(settings) = self.store.cycle_settings()? else {
            return Ok(None);
        };
        match CycleConfiguration::try_from(&settings) {
            Ok(config) => Ok(Some(config.anchored_to(&self.store.period_log()?))),
            Err(err) => {
                warn!(%err, "stored cycle settings are unusable");
                Ok(None)
            }
        }
    }

    pub fn status(&self) -> Result<CycleStatus, TrackerError> {
        let today = self.today();
        Ok(match self.configuration()? {
            Some(config) => CycleStatus::compute(&config, today),
            None => prediction::compute_cycle_status_or_default(None, today),
        })
    }

    pub fn calendar(
        &self,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<CalendarMarking, TrackerError> {
        let log = self.store.period_log()?;
        Ok(match self.configuration()? {
            Some(config) => {
                calendar::compute_calendar_marking(&config, &log, range_start, range_end)
            }
            None => calendar::logged_marking(&log, range_start, range_end),
        })
    }

    pub fn month_calendar(&self, year: i32, month: u32) -> Result<CalendarMarking, TrackerError> {
        let (first, last) =
            dates::month_bounds(year, month).ok_or(TrackerError::InvalidMonth { year, month })?;
        self.calendar(first, last)
    }

    /// From the earliest logged period (or the anchor) to `horizon_months`
    /// past the anchor.
    pub fn default_range(
        &self,
        horizon_months: u32,
    ) -> Result<(NaiveDate, NaiveDate), TrackerError> {
        let log = self.store.period_log()?;
        let anchor = match self.configuration()? {
            Some(config) => config.last_period_start,
            None => log.last().copied().unwrap_or_else(|| self.today()),
        };
        let start = log.first().copied().map_or(anchor, |first| first.min(anchor));
        let end = anchor
            .checked_add_months(Months::new(horizon_months))
            .unwrap_or(NaiveDate::MAX);
        debug!(%start, %end, "default calendar range");
        Ok((start, end))
    }

    pub fn period_log(&self) -> Result<Vec<NaiveDate>, TrackerError> {
        Ok(self.store.period_log()?)
    }

    pub fn log_period(&mut self, date: NaiveDate) -> Result<bool, TrackerError> {
        let added = self.store.add_period_date(date)?;
        if added {
            info!(%date, "logged period start");
        }
        Ok(added)
    }

    pub fn remove_period(&mut self, date: NaiveDate) -> Result<bool, TrackerError> {
        let removed = self.store.remove_period_date(date)?;
        if removed {
            info!(%date, "removed period start");
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CycleStats, TrackerError> {
        Ok(prediction::cycle_stats(&self.store.period_log()?))
    }

    pub fn outlook(&self) -> Result<Option<PeriodOutlook>, TrackerError> {
        let log = self.store.period_log()?;
        Ok(self
            .configuration()?
            .map(|config| prediction::period_outlook(&config, &log, self.today())))
    }

    /// Fertility window of the cycle containing today.
    pub fn fertility(&self) -> Result<Option<FertilityWindow>, TrackerError> {
        let today = self.today();
        Ok(self.configuration()?.map(|config| {
            let start = prediction::current_cycle_start(&config, today);
            prediction::fertility_window(&config, start)
        }))
    }

    pub fn reminder_settings(&self) -> Result<ReminderSettings, TrackerError> {
        Ok(self.store.reminder_settings()?)
    }

    pub fn set_reminder_settings(
        &mut self,
        settings: &ReminderSettings,
    ) -> Result<(), TrackerError> {
        Ok(self.store.set_reminder_settings(settings)?)
    }

    pub fn reminders(&self, lead_days: u32) -> Result<Vec<Reminder>, TrackerError> {
        let Some(config) = self.configuration()? else {
            return Ok(Vec::new());
        };
        let settings = self.store.reminder_settings()?;
        Ok(reminders::plan_reminders(
            &config,
            &settings,
            self.clock.now(),
            lead_days,
        ))
    }

    pub fn medications(&self) -> Result<Vec<Medication>, TrackerError> {
        Ok(self.store.medications()?)
    }

    pub fn add_medication(
        &mut self,
        name: &str,
        dosage: &str,
        frequency: Frequency,
    ) -> Result<Uuid, TrackerError> {
        let medication = Medication::new(name, dosage, frequency, self.today());
        let id = medication.id;
        self.store.add_medication(medication)?;
        info!(%id, name, "added medication");
        Ok(id)
    }

    /// Record a dose taken today. Returns `false` for an unknown id.
    pub fn take_medication(&mut self, id: Uuid) -> Result<bool, TrackerError> {
        let today = self.today();
        Ok(self.store.record_dose(id, today)?)
    }

    pub fn adherence(&self) -> Result<u8, TrackerError> {
        Ok(medication::adherence(&self.store.medications()?, self.today()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStore;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tracker_on(date: NaiveDate) -> Tracker<MemoryStore, FixedClock> {
        Tracker::new(MemoryStore::new(), FixedClock::on(date))
    }

    #[test]
    fn unconfigured_tracker_uses_default_status() {
        let tracker = tracker_on(ymd(2024, 3, 3));
        let status = tracker.status().unwrap();
        assert_eq!(status.current_day_in_cycle, 1);
        assert_eq!(status.phase, Phase::Menstruation);
        assert_eq!(status.cycle_length_days, 28);
        assert_eq!(tracker.outlook().unwrap(), None);
        assert!(tracker.reminders(2).unwrap().is_empty());
    }

    #[test]
    fn update_settings_validates_ranges() {
        let mut tracker = tracker_on(ymd(2024, 1, 1));
        assert!(matches!(
            tracker.update_settings(ymd(2024, 1, 1), 20, 5),
            Err(TrackerError::InvalidCycleLength(20))
        ));
        assert!(matches!(
            tracker.update_settings(ymd(2024, 1, 1), 28, 11),
            Err(TrackerError::InvalidPeriodLength(11))
        ));
        assert_eq!(tracker.settings().unwrap(), None);
        tracker.update_settings(ymd(2024, 1, 1), 35, 10).unwrap();
        assert!(tracker.settings().unwrap().is_some());
    }

    #[test]
    fn update_settings_keeps_notification_flag() {
        let mut store = MemoryStore::new();
        let mut old = CycleSettings::new(ymd(2023, 12, 1), 28, 5);
        old.notifications_enabled = true;
        store.set_cycle_settings(&old).unwrap();
        let mut tracker = Tracker::new(store, FixedClock::on(ymd(2024, 1, 1)));

        let saved = tracker.update_settings(ymd(2024, 1, 1), 30, 4).unwrap();
        assert!(saved.notifications_enabled);
        assert_eq!(saved.cycle_days, 30);
    }

    #[test]
    fn newer_log_reanchors_status() {
        let mut tracker = tracker_on(ymd(2024, 2, 5));
        tracker.update_settings(ymd(2024, 1, 1), 28, 5).unwrap();
        tracker.log_period(ymd(2024, 2, 2)).unwrap();
        let status = tracker.status().unwrap();
        assert_eq!(status.current_cycle_start, ymd(2024, 2, 2));
        assert_eq!(status.current_day_in_cycle, 4);
        assert_eq!(status.next_period_date, ymd(2024, 3, 1));
    }

    #[test]
    fn month_calendar_rejects_bad_month() {
        let tracker = tracker_on(ymd(2024, 1, 1));
        assert!(matches!(
            tracker.month_calendar(2024, 13),
            Err(TrackerError::InvalidMonth { year: 2024, month: 13 })
        ));
    }

    #[test]
    fn calendar_without_settings_shows_logged_only() {
        let mut tracker = tracker_on(ymd(2024, 1, 20));
        tracker.log_period(ymd(2024, 1, 3)).unwrap();
        let marking = tracker.month_calendar(2024, 1).unwrap();
        assert_eq!(marking.len(), 1);
        assert_eq!(
            marking.get(&ymd(2024, 1, 3)),
            Some(MarkingCategory::LoggedPeriod)
        );
    }

    #[test]
    fn default_range_spans_history_and_horizon() {
        let mut tracker = tracker_on(ymd(2024, 2, 10));
        tracker.update_settings(ymd(2024, 1, 1), 28, 5).unwrap();
        tracker.log_period(ymd(2023, 11, 6)).unwrap();
        let (start, end) = tracker.default_range(6).unwrap();
        assert_eq!(start, ymd(2023, 11, 6));
        assert_eq!(end, ymd(2024, 7, 1));
    }

    #[test]
    fn medication_flow() {
        let mut tracker = tracker_on(ymd(2024, 1, 10));
        let id = tracker.add_medication("Iron", "20mg", Frequency::Daily).unwrap();
        assert_eq!(tracker.adherence().unwrap(), 0);
        assert!(tracker.take_medication(id).unwrap());
        assert_eq!(tracker.adherence().unwrap(), 100);
        assert!(!tracker.take_medication(Uuid::new_v4()).unwrap());
        let meds = tracker.medications().unwrap();
        assert_eq!(meds[0].taken_on, vec![ymd(2024, 1, 10)]);
    }
}
