//! Plain-text rendering for terminal output.

use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use bloomcycle::calendar::CalendarMarking;
use bloomcycle::dates;
use bloomcycle::models::{
    CycleSettings, CycleStats, CycleStatus, FertilityWindow, Frequency, MarkingCategory,
    Medication, Reminder, ReminderSettings,
};

pub fn status(status: &CycleStatus, fertility: Option<&FertilityWindow>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Day {} of {} ({})",
        status.current_day_in_cycle, status.cycle_length_days, status.phase
    );
    let _ = writeln!(out, "Cycle started {}", status.current_cycle_start);
    let _ = writeln!(
        out,
        "Next period {} (in {} days)",
        status.next_period_date, status.days_until_next_period
    );
    if let Some(window) = fertility {
        let _ = writeln!(
            out,
            "Fertile window {} to {}, peak from {}",
            window.fertile_start, window.fertile_end, window.peak_start
        );
    }
    out
}

pub fn settings(settings: Option<&CycleSettings>) -> String {
    let Some(settings) = settings else {
        return "No cycle settings saved. Run `bloomcycle settings set`.\n".to_string();
    };
    format!(
        "Last period:  {}\nCycle length: {} days\nPeriod length: {} days\n",
        settings.last_period_date.as_deref().unwrap_or("not set"),
        settings.cycle_days,
        settings.menstrual_days
    )
}

fn marker(category: Option<MarkingCategory>) -> char {
    match category {
        Some(MarkingCategory::LoggedPeriod) => '*',
        Some(MarkingCategory::PredictedPeriod) => '~',
        None => ' ',
    }
}

/// One line per marked date.
pub fn marking_list(marking: &CalendarMarking) -> String {
    if marking.is_empty() {
        return "No period days in range.\n".to_string();
    }
    let mut out = String::new();
    for (date, category) in marking.iter() {
        let label = match category {
            MarkingCategory::LoggedPeriod => "logged",
            MarkingCategory::PredictedPeriod => "predicted",
        };
        let _ = writeln!(out, "{}  {label}", dates::to_iso(*date));
    }
    out
}

/// Monday-first month grid. `*` logged, `~` predicted.
pub fn month_grid(first: NaiveDate, last: NaiveDate, marking: &CalendarMarking) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", first.format("%B %Y"));
    out.push_str(" Mo  Tu  We  Th  Fr  Sa  Su\n");

    let lead = first.weekday().num_days_from_monday() as usize;
    out.push_str(&"    ".repeat(lead));
    for date in first.iter_days().take_while(|d| *d <= last) {
        let _ = write!(out, "{:>3}{}", date.day(), marker(marking.get(&date)));
        if date.weekday() == chrono::Weekday::Sun {
            out.push('\n');
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("* logged  ~ predicted\n");
    out
}

pub fn period_log(log: &[NaiveDate]) -> String {
    if log.is_empty() {
        return "No periods logged.\n".to_string();
    }
    log.iter().map(|d| format!("{}\n", dates::to_iso(*d))).collect()
}

pub fn stats(stats: &CycleStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Logged periods: {}", stats.total_cycles);
    match (stats.avg_cycle_length, stats.shortest_cycle, stats.longest_cycle) {
        (Some(avg), Some(shortest), Some(longest)) => {
            let _ = writeln!(out, "Average cycle:  {avg:.1} days");
            let _ = writeln!(out, "Shortest cycle: {shortest} days");
            let _ = writeln!(out, "Longest cycle:  {longest} days");
        }
        _ => out.push_str("Log at least two periods to see cycle lengths.\n"),
    }
    if let Some(last) = stats.last_period_start {
        let _ = writeln!(out, "Last period:    {last}");
    }
    out
}

pub fn reminders(settings: &ReminderSettings, planned: &[Reminder]) -> String {
    let flag = |on: bool| if on { "on" } else { "off" };
    let mut out = String::new();
    let _ = writeln!(out, "All reminders:  {}", flag(settings.enable_all));
    let _ = writeln!(out, "Period:         {}", flag(settings.menstrual_reminder));
    let _ = writeln!(out, "Fertile window: {}", flag(settings.ovulation_reminder));
    let _ = writeln!(out, "Peak fertility: {}", flag(settings.ovulation_day_reminder));
    let _ = writeln!(out, "Fertile end:    {}", flag(settings.ovulation_end_reminder));
    let _ = writeln!(out, "Time:           {}", settings.reminder_time.format("%H:%M"));
    if !planned.is_empty() {
        out.push_str("\nUpcoming:\n");
        for reminder in planned {
            let _ = writeln!(
                out,
                "  {}  {}",
                reminder.at.format("%Y-%m-%d %H:%M"),
                reminder.kind.message()
            );
        }
    }
    out
}

fn describe_frequency(frequency: &Frequency) -> String {
    match frequency {
        Frequency::Daily => "daily".to_string(),
        Frequency::EveryNDays { interval } => format!("every {interval} days"),
        Frequency::Weekly { days_of_week } => {
            let days: Vec<String> = days_of_week.iter().map(|d| d.to_string()).collect();
            format!("weekly on {}", days.join(", "))
        }
        Frequency::Monthly { day_of_month } => format!("monthly on day {day_of_month}"),
    }
}

pub fn medications(medications: &[Medication], today: NaiveDate) -> String {
    if medications.is_empty() {
        return "No medications.\n".to_string();
    }
    let mut out = String::new();
    for med in medications {
        let next = med
            .next_dose(today)
            .map_or_else(|| "never".to_string(), dates::to_iso);
        let _ = writeln!(
            out,
            "{}  {} {} ({}), next dose {next}",
            med.id,
            med.name,
            med.dosage,
            describe_frequency(&med.frequency)
        );
    }
    out
}
