//! Calendar markings for logged and predicted period days.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::dates;
use crate::models::{CycleConfiguration, MarkingCategory};

/// Date → category map, ordered by date. Serialises with `yyyy-MM-dd` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarMarking {
    marks: BTreeMap<NaiveDate, MarkingCategory>,
}

impl CalendarMarking {
    pub fn get(&self, date: &NaiveDate) -> Option<MarkingCategory> {
        self.marks.get(date).copied()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &MarkingCategory)> {
        self.marks.iter()
    }

    pub fn dates_with(&self, category: MarkingCategory) -> Vec<NaiveDate> {
        self.marks
            .iter()
            .filter(|(_, c)| **c == category)
            .map(|(d, _)| *d)
            .collect()
    }

    pub fn to_iso_map(&self) -> BTreeMap<String, MarkingCategory> {
        self.marks
            .iter()
            .map(|(d, c)| (dates::to_iso(*d), *c))
            .collect()
    }
}

impl Serialize for CalendarMarking {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_iso_map().serialize(serializer)
    }
}

/// Marking with logged starts only, for when no cycle is configured.
pub fn logged_marking(
    period_log: &[NaiveDate],
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> CalendarMarking {
    let marks = period_log
        .iter()
        .filter(|d| **d >= range_start && **d <= range_end)
        .map(|d| (*d, MarkingCategory::LoggedPeriod))
        .collect();
    CalendarMarking { marks }
}

/// Mark logged starts and predicted period days inside `[range_start, range_end]`.
///
/// Each logged start marks that single day. Predicted cycles begin at
/// `config.last_period_start` and repeat every cycle length; each covers
/// `period_length_days` days. A logged mark is never replaced by a prediction.
pub fn compute_calendar_marking(
    config: &CycleConfiguration,
    period_log: &[NaiveDate],
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> CalendarMarking {
    if range_start > range_end {
        return CalendarMarking::default();
    }
    let mut marks = logged_marking(period_log, range_start, range_end).marks;

    let length = config.effective_cycle_length();
    let period_days = i64::from(config.period_length_days);

    // Skip whole cycles that end before the range opens.
    let mut cycle_start = config.last_period_start;
    let lead = (range_start - cycle_start).num_days() - period_days;
    if lead > 0 {
        cycle_start = dates::add_days(cycle_start, length * (lead / length));
    }

    while cycle_start <= range_end {
        if period_days > 0 {
            let first = cycle_start.max(range_start);
            let last = dates::add_days(cycle_start, period_days - 1).min(range_end);
            for date in first.iter_days().take_while(|d| *d <= last) {
                marks.entry(date).or_insert(MarkingCategory::PredictedPeriod);
            }
        }
        match cycle_start.checked_add_days(Days::new(length.unsigned_abs())) {
            Some(next) => cycle_start = next,
            None => break,
        }
    }

    debug!(
        from = %range_start,
        to = %range_end,
        marked = marks.len(),
        "computed calendar marking"
    );
    CalendarMarking { marks }
}
