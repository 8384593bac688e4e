//! Typed views over a [`KeyValueStore`].
//!
//! Each trait is implemented for every key/value store, so the tracker can be
//! backed by the encrypted vault or an in-memory map interchangeably.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dates;
use crate::models::{CycleSettings, Medication, ReminderSettings};
use crate::storage::{keys, KeyValueStore, StorageError};

fn read_json<T: DeserializeOwned>(
    store: &(impl KeyValueStore + ?Sized),
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn write_json<T: Serialize + ?Sized>(
    store: &mut (impl KeyValueStore + ?Sized),
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw)
}

pub trait SettingsStore {
    /// Stored cycle settings. Unreadable settings count as absent.
    fn cycle_settings(&self) -> Result<Option<CycleSettings>, StorageError>;
    fn set_cycle_settings(&mut self, settings: &CycleSettings) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> SettingsStore for S {
    fn cycle_settings(&self) -> Result<Option<CycleSettings>, StorageError> {
        match read_json(self, keys::CYCLE_SETTINGS) {
            Err(StorageError::Serialization(err)) => {
                warn!(%err, "ignoring unreadable cycle settings");
                Ok(None)
            }
            other => other,
        }
    }

    fn set_cycle_settings(&mut self, settings: &CycleSettings) -> Result<(), StorageError> {
        debug!(?settings, "saving cycle settings");
        write_json(self, keys::CYCLE_SETTINGS, settings)
    }
}

/// Recorded period start dates, kept sorted and free of duplicates.
pub trait PeriodLogStore {
    fn period_log(&self) -> Result<Vec<NaiveDate>, StorageError>;
    /// Returns `false` when the date was already recorded.
    fn add_period_date(&mut self, date: NaiveDate) -> Result<bool, StorageError>;
    /// Returns `false` when the date was not recorded.
    fn remove_period_date(&mut self, date: NaiveDate) -> Result<bool, StorageError>;
}

fn write_period_log(
    store: &mut (impl KeyValueStore + ?Sized),
    log: &[NaiveDate],
) -> Result<(), StorageError> {
    let raw: Vec<String> = log.iter().copied().map(dates::to_iso).collect();
    write_json(store, keys::PERIOD_DATES, &raw)
}

impl<S: KeyValueStore + ?Sized> PeriodLogStore for S {
    fn period_log(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let raw: Vec<String> = read_json(self, keys::PERIOD_DATES)?.unwrap_or_default();
        let mut log: Vec<NaiveDate> = raw
            .iter()
            .filter_map(|entry| {
                let parsed = dates::parse_calendar_date(entry);
                if parsed.is_none() {
                    warn!(entry = %entry, "skipping unparseable period date");
                }
                parsed
            })
            .collect();
        log.sort();
        log.dedup();
        Ok(log)
    }

    fn add_period_date(&mut self, date: NaiveDate) -> Result<bool, StorageError> {
        let mut log = self.period_log()?;
        match log.binary_search(&date) {
            Ok(_) => Ok(false),
            Err(at) => {
                log.insert(at, date);
                write_period_log(self, &log)?;
                Ok(true)
            }
        }
    }

    fn remove_period_date(&mut self, date: NaiveDate) -> Result<bool, StorageError> {
        let mut log = self.period_log()?;
        match log.binary_search(&date) {
            Ok(at) => {
                log.remove(at);
                write_period_log(self, &log)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

pub trait ReminderSettingsStore {
    fn reminder_settings(&self) -> Result<ReminderSettings, StorageError>;
    fn set_reminder_settings(&mut self, settings: &ReminderSettings) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> ReminderSettingsStore for S {
    fn reminder_settings(&self) -> Result<ReminderSettings, StorageError> {
        Ok(read_json(self, keys::NOTIFICATION_SETTINGS)?.unwrap_or_default())
    }

    fn set_reminder_settings(&mut self, settings: &ReminderSettings) -> Result<(), StorageError> {
        write_json(self, keys::NOTIFICATION_SETTINGS, settings)
    }
}

pub trait MedicationStore {
    fn medications(&self) -> Result<Vec<Medication>, StorageError>;
    fn add_medication(&mut self, medication: Medication) -> Result<(), StorageError>;
    /// Record a dose taken on `date`. Returns `false` for an unknown id.
    fn record_dose(&mut self, id: Uuid, date: NaiveDate) -> Result<bool, StorageError>;
}

impl<S: KeyValueStore + ?Sized> MedicationStore for S {
    fn medications(&self) -> Result<Vec<Medication>, StorageError> {
        Ok(read_json(self, keys::MEDICATIONS)?.unwrap_or_default())
    }

    fn add_medication(&mut self, medication: Medication) -> Result<(), StorageError> {
        let mut all = self.medications()?;
        all.push(medication);
        write_json(self, keys::MEDICATIONS, &all)
    }

    fn record_dose(&mut self, id: Uuid, date: NaiveDate) -> Result<bool, StorageError> {
        let mut all = self.medications()?;
        let Some(medication) = all.iter_mut().find(|m| m.id == id) else {
            return Ok(false);
        };
        medication.taken_on.push(date);
        medication.taken_on.sort();
        write_json(self, keys::MEDICATIONS, &all)?;
        Ok(true)
    }
}
