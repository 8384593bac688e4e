use chrono::{Datelike, Days, NaiveDate};

use crate::dates;
use crate::models::{Frequency, Medication};

/// Calendar days scored for adherence, today included.
pub const ADHERENCE_WINDOW_DAYS: i64 = 7;

impl Frequency {
    /// Calendar schedules only. Interval schedules depend on their start, see
    /// [`Frequency::is_due_since`].
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        match self {
            Frequency::Daily => true,
            Frequency::EveryNDays { .. } => false,
            Frequency::Weekly { days_of_week } => days_of_week.contains(&date.weekday()),
            Frequency::Monthly { day_of_month } => date.day() == *day_of_month,
        }
    }

    /// Whether a dose is due on `date` for a schedule that began on `start`.
    pub fn is_due_since(&self, start: NaiveDate, date: NaiveDate) -> bool {
        match self {
            Frequency::EveryNDays { interval } => {
                let elapsed = (date - start).num_days();
                elapsed >= 0 && elapsed % i64::from((*interval).max(1)) == 0
            }
            _ => date >= start && self.is_due_on(date),
        }
    }

    /// Smallest date strictly after `after` on which a dose is due.
    ///
    /// `None` when the schedule can never fire: an empty weekday set or a
    /// day of month above 31.
    pub fn next_due(&self, after: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => after.succ_opt(),
            Frequency::EveryNDays { interval } => {
                after.checked_add_days(Days::new(u64::from((*interval).max(1))))
            }
            // Any weekday recurs within 7 days, any valid month day within 62.
            Frequency::Weekly { .. } => self.scan_after(after, 7),
            Frequency::Monthly { .. } => self.scan_after(after, 62),
        }
    }

    fn scan_after(&self, after: NaiveDate, horizon: usize) -> Option<NaiveDate> {
        after
            .iter_days()
            .skip(1)
            .take(horizon)
            .find(|date| self.is_due_on(*date))
    }

    /// Doses due from `from` through `to`, both inclusive, for a schedule
    /// that began on `start`.
    fn expected_doses(&self, start: NaiveDate, from: NaiveDate, to: NaiveDate) -> u32 {
        from.iter_days()
            .take_while(|date| *date <= to)
            .filter(|date| self.is_due_since(start, *date))
            .count() as u32
    }
}

impl Medication {
    /// Next date a dose is due, counting from the last recorded dose.
    pub fn next_dose(&self, today: NaiveDate) -> Option<NaiveDate> {
        if let Some(&last) = self.taken_on.iter().max() {
            return self.frequency.next_due(last);
        }
        match self.frequency {
            Frequency::Daily | Frequency::EveryNDays { .. } => Some(today),
            _ if self.frequency.is_due_on(today) => Some(today),
            _ => self.frequency.next_due(today),
        }
    }
}

/// Percentage of due doses taken over the trailing week, capped at 100.
///
/// The week is the seven calendar days ending today. A medication counts
/// from the day it was added, so a daily dose taken on that day scores 100.
pub fn adherence(medications: &[Medication], today: NaiveDate) -> u8 {
    let window_start = dates::add_days(today, 1 - ADHERENCE_WINDOW_DAYS);
    let mut expected = 0u32;
    let mut taken = 0u32;

    for medication in medications {
        let from = window_start.max(medication.created_on);
        expected += medication
            .frequency
            .expected_doses(medication.created_on, from, today);
        taken += medication
            .taken_on
            .iter()
            .filter(|d| **d >= window_start && **d <= today)
            .count() as u32;
    }

    if expected == 0 {
        return 0;
    }
    let percent = (f64::from(taken) / f64::from(expected) * 100.0).round();
    percent.min(100.0) as u8
}
