//! # bloomcycle
//!
//! Private, on-device cycle tracking.
//!
//! The core is [`prediction`] and [`calendar`]: pure functions that turn a
//! cycle configuration and a date into the current cycle day, phase and next
//! period, and into calendar markings for logged and predicted period days.
//! Around it sit an encrypted key/value vault ([`storage`], [`crypto`]),
//! typed record views ([`records`]) and the [`commands::Tracker`] that ties
//! them to a [`clock::Clock`].
//!
//! ```
//! use bloomcycle::{CycleConfiguration, CycleStatus};
//! use chrono::NaiveDate;
//!
//! let config = CycleConfiguration::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 28, 5);
//! let status = CycleStatus::compute(&config, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
//! assert_eq!(status.current_day_in_cycle, 15);
//! ```

pub mod calendar;
pub mod clock;
pub mod commands;
pub mod crypto;
pub mod dates;
pub mod medication;
pub mod models;
pub mod prediction;
pub mod records;
pub mod reminders;
pub mod storage;

pub use calendar::{compute_calendar_marking, CalendarMarking};
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{Tracker, TrackerError};
pub use models::{
    CycleConfiguration, CycleSettings, CycleStatus, FertilityWindow, Frequency, MarkingCategory,
    Medication, Phase, Reminder, ReminderKind, ReminderSettings,
};
pub use prediction::{
    compute_cycle_status, compute_cycle_status_or_default, PeriodOutlook, PhaseThresholds,
    PredictionError,
};
pub use storage::{EncryptedFileStore, KeyValueStore, MemoryStore, StorageError};
