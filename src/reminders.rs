//! Upcoming reminder times derived from the cycle configuration.
//!
//! Only the schedule is computed here. Delivering notifications is left to
//! whatever surface embeds the tracker.

use chrono::{NaiveDate, NaiveDateTime};

use crate::dates;
use crate::models::{CycleConfiguration, Reminder, ReminderKind, ReminderSettings};
use crate::prediction::{current_cycle_start, fertility_window, next_period_date};

pub const DEFAULT_LEAD_DAYS: u32 = 2;

const KINDS: [ReminderKind; 4] = [
    ReminderKind::Menstrual,
    ReminderKind::Ovulation,
    ReminderKind::OvulationDay,
    ReminderKind::OvulationEnd,
];

fn enabled(settings: &ReminderSettings, kind: ReminderKind) -> bool {
    settings.enable_all
        || match kind {
            ReminderKind::Menstrual => settings.menstrual_reminder,
            ReminderKind::Ovulation => settings.ovulation_reminder,
            ReminderKind::OvulationDay => settings.ovulation_day_reminder,
            ReminderKind::OvulationEnd => settings.ovulation_end_reminder,
        }
}

fn reminder_date(
    config: &CycleConfiguration,
    kind: ReminderKind,
    cycle_start: NaiveDate,
    lead_days: u32,
) -> NaiveDate {
    let window = fertility_window(config, cycle_start);
    match kind {
        ReminderKind::Menstrual => dates::add_days(cycle_start, -i64::from(lead_days)),
        ReminderKind::Ovulation => dates::add_days(window.fertile_start, -1),
        ReminderKind::OvulationDay => window.peak_start,
        ReminderKind::OvulationEnd => window.fertile_end,
    }
}

/// Next occurrence of every enabled reminder strictly after `now`, earliest first.
pub fn plan_reminders(
    config: &CycleConfiguration,
    settings: &ReminderSettings,
    now: NaiveDateTime,
    lead_days: u32,
) -> Vec<Reminder> {
    let today = now.date();
    let next = next_period_date(config, today);
    let cycle_starts = [
        current_cycle_start(config, today),
        next,
        dates::add_days(next, config.effective_cycle_length()),
    ];

    let mut planned: Vec<Reminder> = KINDS
        .iter()
        .filter(|kind| enabled(settings, **kind))
        .filter_map(|&kind| {
            cycle_starts
                .iter()
                .map(|start| reminder_date(config, kind, *start, lead_days))
                .map(|date| date.and_time(settings.reminder_time))
                .filter(|at| *at > now)
                .min()
                .map(|at| Reminder { kind, at })
        })
        .collect();
    planned.sort_by_key(|r| (r.at, r.kind));
    planned
}
