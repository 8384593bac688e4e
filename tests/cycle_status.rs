use bloomcycle::{
    compute_calendar_marking, compute_cycle_status, compute_cycle_status_or_default,
    CycleConfiguration, CycleSettings, CycleStatus, MarkingCategory, Phase,
};
use chrono::NaiveDate;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn standard() -> CycleConfiguration {
    CycleConfiguration::new(ymd(2024, 1, 1), 28, 5)
}

#[test]
fn first_day_of_cycle() {
    let status = CycleStatus::compute(&standard(), ymd(2024, 1, 1));
    assert_eq!(status.current_day_in_cycle, 1);
    assert_eq!(status.phase, Phase::Menstruation);
    assert_eq!(status.next_period_date, ymd(2024, 1, 29));
    assert_eq!(status.days_until_next_period, 28);
}

#[test]
fn day_after_ovulation_threshold_is_luteal() {
    let status = CycleStatus::compute(&standard(), ymd(2024, 1, 15));
    assert_eq!(status.current_day_in_cycle, 15);
    assert_eq!(status.phase, Phase::Luteal);
}

#[test]
fn full_cycle_elapsed_starts_new_cycle() {
    let status = CycleStatus::compute(&standard(), ymd(2024, 1, 29));
    assert_eq!(status.current_cycle_start, ymd(2024, 1, 29));
    assert_eq!(status.current_day_in_cycle, 1);
    assert_eq!(status.phase, Phase::Menstruation);
    assert_eq!(status.next_period_date, ymd(2024, 2, 26));
}

#[test]
fn today_before_last_period_clamps_to_anchor() {
    let status = CycleStatus::compute(&standard(), ymd(2023, 12, 29));
    assert_eq!(status.current_cycle_start, ymd(2024, 1, 1));
    assert_eq!(status.current_day_in_cycle, 1);
    assert_eq!(status.phase, Phase::Menstruation);
    assert_eq!(status.next_period_date, ymd(2024, 1, 1));
    assert_eq!(status.days_until_next_period, 3);
}

#[test]
fn logged_date_wins_over_prediction() {
    let config = CycleConfiguration::new(ymd(2024, 1, 1), 31, 5);
    let log = [ymd(2024, 1, 1), ymd(2024, 2, 1)];
    let marking = compute_calendar_marking(&config, &log, ymd(2024, 1, 1), ymd(2024, 2, 29));

    assert_eq!(marking.get(&ymd(2024, 2, 1)), Some(MarkingCategory::LoggedPeriod));
    assert_eq!(marking.get(&ymd(2024, 1, 1)), Some(MarkingCategory::LoggedPeriod));
    assert_eq!(marking.get(&ymd(2024, 2, 2)), Some(MarkingCategory::PredictedPeriod));
    assert_eq!(
        marking.dates_with(MarkingCategory::LoggedPeriod),
        vec![ymd(2024, 1, 1), ymd(2024, 2, 1)]
    );
    // Two predicted spans of five days, one day of each taken by a log.
    assert_eq!(marking.dates_with(MarkingCategory::PredictedPeriod).len(), 8);
}

#[test]
fn repeated_calls_agree() {
    let settings = CycleSettings::new(ymd(2024, 1, 1), 30, 4);
    let today = ymd(2024, 5, 17);
    let first = compute_cycle_status(&settings, today).unwrap();
    let second = compute_cycle_status(&settings, today).unwrap();
    assert_eq!(first, second);
}

#[test]
fn stored_timestamp_is_read_at_date_granularity() {
    let settings = CycleSettings {
        last_period_date: Some("2024-01-01T18:30:00.000Z".to_string()),
        ..CycleSettings::default()
    };
    let status = compute_cycle_status(&settings, ymd(2024, 1, 2)).unwrap();
    assert_eq!(status.current_day_in_cycle, 2);
}

#[test]
fn missing_configuration_degrades_to_default() {
    let today = ymd(2024, 6, 1);
    let broken = CycleSettings {
        last_period_date: Some("not a date".to_string()),
        ..CycleSettings::default()
    };
    for settings in [None, Some(&broken)] {
        let status = compute_cycle_status_or_default(settings, today);
        assert_eq!(status.current_day_in_cycle, 1);
        assert_eq!(status.phase, Phase::Menstruation);
        assert_eq!(status.cycle_length_days, 28);
    }
}
