use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dates;
use crate::models::{
    CycleConfiguration, CycleSettings, CycleStats, CycleStatus, FertilityWindow, Phase,
    DEFAULT_CYCLE_DAYS, DEFAULT_MENSTRUAL_DAYS,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionError {
    #[error("cycle configuration missing or last period date unparseable")]
    ConfigurationMissing,
}

impl TryFrom<&CycleSettings> for CycleConfiguration {
    type Error = PredictionError;

    fn try_from(settings: &CycleSettings) -> Result<Self, Self::Error> {
        let last_period_start = settings
            .last_period_date
            .as_deref()
            .and_then(dates::parse_calendar_date)
            .ok_or(PredictionError::ConfigurationMissing)?;

        // Zero means "never set" in stored settings.
        let cycle_length_days = match settings.cycle_days {
            0 => DEFAULT_CYCLE_DAYS,
            n => n,
        };
        let period_length_days = match settings.menstrual_days {
            0 => DEFAULT_MENSTRUAL_DAYS,
            n => n,
        };

        Ok(CycleConfiguration::new(
            last_period_start,
            cycle_length_days,
            period_length_days,
        ))
    }
}

/// Inclusive upper day bounds of the first three phases.
///
/// Bounds never decrease, so the first-match chain in [`Self::phase_for_day`]
/// agrees with applying the thresholds as cascading overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseThresholds {
    pub menstruation: u32,
    pub follicular: u32,
    pub ovulation: u32,
}

impl PhaseThresholds {
    pub fn new(cycle_length_days: u32, period_length_days: u32) -> Self {
        let cycle = cycle_length_days.max(1);
        let menstruation = period_length_days.min(cycle);
        // floor(0.4 * L) never exceeds L, so the narrowing cannot fail.
        let two_fifths = u32::try_from(u64::from(cycle) * 2 / 5).unwrap_or(cycle);
        let follicular = two_fifths.max(menstruation);
        let ovulation = (cycle / 2).max(follicular);
        Self {
            menstruation,
            follicular,
            ovulation,
        }
    }

    pub fn for_config(config: &CycleConfiguration) -> Self {
        Self::new(config.cycle_length_days, config.period_length_days)
    }

    pub fn phase_for_day(&self, day: u32) -> Phase {
        if day <= self.menstruation {
            Phase::Menstruation
        } else if day <= self.follicular {
            Phase::Follicular
        } else if day <= self.ovulation {
            Phase::Ovulation
        } else {
            Phase::Luteal
        }
    }
}

/// Start of the cycle containing `today`.
///
/// Before the anchor there is no earlier known cycle, so the anchor itself is
/// returned.
pub fn current_cycle_start(config: &CycleConfiguration, today: NaiveDate) -> NaiveDate {
    let elapsed = (today - config.last_period_start).num_days();
    if elapsed < 0 {
        return config.last_period_start;
    }
    let length = config.effective_cycle_length();
    dates::add_days(config.last_period_start, length * (elapsed / length))
}

/// First predicted cycle start strictly after `today`.
pub fn next_period_date(config: &CycleConfiguration, today: NaiveDate) -> NaiveDate {
    let elapsed = (today - config.last_period_start).num_days();
    if elapsed < 0 {
        return config.last_period_start;
    }
    let length = config.effective_cycle_length();
    dates::add_days(config.last_period_start, length * (elapsed / length + 1))
}

impl CycleStatus {
    pub fn compute(config: &CycleConfiguration, today: NaiveDate) -> Self {
        let cycle_start = current_cycle_start(config, today);
        let day = ((today - cycle_start).num_days() + 1).max(1);
        let current_day_in_cycle = u32::try_from(day).unwrap_or(u32::MAX);
        let phase = PhaseThresholds::for_config(config).phase_for_day(current_day_in_cycle);
        let next_period_date = next_period_date(config, today);

        let status = Self {
            current_day_in_cycle,
            phase,
            days_until_next_period: (next_period_date - today).num_days(),
            next_period_date,
            current_cycle_start: cycle_start,
            cycle_length_days: config.cycle_length_days,
        };
        debug!(
            day = status.current_day_in_cycle,
            phase = %status.phase,
            next = %status.next_period_date,
            "computed cycle status"
        );
        status
    }

    /// Display default used when no usable configuration exists.
    pub fn fallback(today: NaiveDate) -> Self {
        let length = i64::from(DEFAULT_CYCLE_DAYS);
        Self {
            current_day_in_cycle: 1,
            phase: Phase::Menstruation,
            days_until_next_period: length,
            next_period_date: dates::add_days(today, length),
            current_cycle_start: today,
            cycle_length_days: DEFAULT_CYCLE_DAYS,
        }
    }
}

pub fn compute_cycle_status(
    settings: &CycleSettings,
    today: NaiveDate,
) -> Result<CycleStatus, PredictionError> {
    let config = CycleConfiguration::try_from(settings)?;
    Ok(CycleStatus::compute(&config, today))
}

pub fn compute_cycle_status_or_default(
    settings: Option<&CycleSettings>,
    today: NaiveDate,
) -> CycleStatus {
    match settings.map(|s| compute_cycle_status(s, today)) {
        Some(Ok(status)) => status,
        Some(Err(err)) => {
            warn!(%err, "falling back to default cycle status");
            CycleStatus::fallback(today)
        }
        None => {
            warn!("no cycle settings stored, falling back to default cycle status");
            CycleStatus::fallback(today)
        }
    }
}

/// Fertility window of the cycle starting at `cycle_start`.
/// Ovulation is placed on cycle day `floor(L * 0.5)`.
pub fn fertility_window(config: &CycleConfiguration, cycle_start: NaiveDate) -> FertilityWindow {
    let ovulation_offset = (config.effective_cycle_length() / 2 - 1).max(0);
    let ovulation_day = dates::add_days(cycle_start, ovulation_offset);

    FertilityWindow {
        fertile_start: dates::add_days(ovulation_day, -5),
        fertile_end: ovulation_day,
        ovulation_day,
        peak_start: dates::add_days(ovulation_day, -2),
        peak_end: ovulation_day,
    }
}

/// Outlook for the next period, anchored on the most recent real start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum PeriodOutlook {
    StartsToday,
    Tomorrow,
    InDays(i64),
    Late(i64),
}

impl std::fmt::Display for PeriodOutlook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodOutlook::StartsToday => write!(f, "Your period is expected to start today"),
            PeriodOutlook::Tomorrow => write!(f, "Your period is expected to start tomorrow"),
            PeriodOutlook::InDays(n) => {
                write!(f, "Your period is expected to start in {n} days")
            }
            PeriodOutlook::Late(n) if *n == 1 => write!(f, "Your period is 1 day late"),
            PeriodOutlook::Late(n) => write!(f, "Your period is {n} days late"),
        }
    }
}

pub fn period_outlook(
    config: &CycleConfiguration,
    period_log: &[NaiveDate],
    today: NaiveDate,
) -> PeriodOutlook {
    let anchor = config.anchored_to(period_log).last_period_start;
    let expected = dates::add_days(anchor, config.effective_cycle_length());
    match (expected - today).num_days() {
        0 => PeriodOutlook::StartsToday,
        1 => PeriodOutlook::Tomorrow,
        n if n > 1 => PeriodOutlook::InDays(n),
        n => PeriodOutlook::Late(-n),
    }
}

/// Statistics over the logged period starts.
pub fn cycle_stats(period_log: &[NaiveDate]) -> CycleStats {
    let mut starts = period_log.to_vec();
    starts.sort();
    starts.dedup();

    let cycle_lengths: Vec<i64> = starts
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .collect();

    CycleStats {
        total_cycles: starts.len(),
        avg_cycle_length: if cycle_lengths.is_empty() {
            None
        } else {
            Some(cycle_lengths.iter().sum::<i64>() as f32 / cycle_lengths.len() as f32)
        },
        shortest_cycle: cycle_lengths.iter().copied().min(),
        longest_cycle: cycle_lengths.iter().copied().max(),
        last_period_start: starts.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> CycleConfiguration {
        CycleConfiguration::new(ymd(2024, 1, 1), 28, 5)
    }

    #[test]
    fn first_day_is_menstruation() {
        let status = CycleStatus::compute(&config(), ymd(2024, 1, 1));
        assert_eq!(status.current_day_in_cycle, 1);
        assert_eq!(status.phase, Phase::Menstruation);
        assert_eq!(status.next_period_date, ymd(2024, 1, 29));
        assert_eq!(status.days_until_next_period, 28);
    }

    #[test]
    fn day_fifteen_is_luteal() {
        let status = CycleStatus::compute(&config(), ymd(2024, 1, 15));
        assert_eq!(status.current_day_in_cycle, 15);
        assert_eq!(status.phase, Phase::Luteal);
    }

    #[test]
    fn rolls_over_after_full_cycle() {
        let status = CycleStatus::compute(&config(), ymd(2024, 1, 29));
        assert_eq!(status.current_cycle_start, ymd(2024, 1, 29));
        assert_eq!(status.current_day_in_cycle, 1);
        assert_eq!(status.phase, Phase::Menstruation);
        assert_eq!(status.next_period_date, ymd(2024, 2, 26));
    }

    #[test]
    fn today_before_anchor_clamps_to_day_one() {
        let status = CycleStatus::compute(&config(), ymd(2023, 12, 29));
        assert_eq!(status.current_day_in_cycle, 1);
        assert_eq!(status.current_cycle_start, ymd(2024, 1, 1));
        assert_eq!(status.next_period_date, ymd(2024, 1, 1));
        assert_eq!(status.days_until_next_period, 3);
    }

    #[test]
    fn thresholds_for_common_cycle() {
        let t = PhaseThresholds::new(28, 5);
        assert_eq!(t.menstruation, 5);
        assert_eq!(t.follicular, 11);
        assert_eq!(t.ovulation, 14);
        assert_eq!(t.phase_for_day(5), Phase::Menstruation);
        assert_eq!(t.phase_for_day(6), Phase::Follicular);
        assert_eq!(t.phase_for_day(11), Phase::Follicular);
        assert_eq!(t.phase_for_day(12), Phase::Ovulation);
        assert_eq!(t.phase_for_day(14), Phase::Ovulation);
        assert_eq!(t.phase_for_day(15), Phase::Luteal);
    }

    #[test]
    fn long_period_swallows_follicular_phase() {
        // floor(21 * 0.4) = 8 < 10 menstrual days
        let t = PhaseThresholds::new(21, 10);
        assert_eq!(t.follicular, 10);
        assert_eq!(t.ovulation, 10);
        assert_eq!(t.phase_for_day(9), Phase::Menstruation);
        assert_eq!(t.phase_for_day(10), Phase::Menstruation);
        assert_eq!(t.phase_for_day(11), Phase::Luteal);
    }

    #[test]
    fn period_longer_than_cycle_is_clamped() {
        let t = PhaseThresholds::new(4, 9);
        assert_eq!(t.menstruation, 4);
        let cfg = CycleConfiguration::new(ymd(2024, 1, 1), 4, 9);
        let status = CycleStatus::compute(&cfg, ymd(2024, 1, 7));
        assert_eq!(status.current_day_in_cycle, 3);
        assert_eq!(status.phase, Phase::Menstruation);
    }

    #[test]
    fn zero_cycle_length_does_not_divide_by_zero() {
        let cfg = CycleConfiguration::new(ymd(2024, 1, 1), 0, 5);
        let status = CycleStatus::compute(&cfg, ymd(2024, 1, 10));
        assert_eq!(status.current_day_in_cycle, 1);
        assert_eq!(status.next_period_date, ymd(2024, 1, 11));
    }

    #[test]
    fn huge_cycle_length_still_computes() {
        let settings = CycleSettings {
            cycle_days: u32::MAX,
            ..CycleSettings::new(ymd(2024, 1, 1), 28, 5)
        };
        let status = compute_cycle_status(&settings, ymd(2024, 1, 10)).unwrap();
        assert_eq!(status.current_day_in_cycle, 10);
        assert_eq!(status.phase, Phase::Follicular);
        assert_eq!(status.next_period_date, NaiveDate::MAX);

        let cfg = CycleConfiguration::new(ymd(2024, 1, 1), 100_000_000, 5);
        let status = CycleStatus::compute(&cfg, ymd(2024, 1, 10));
        assert_eq!(status.current_cycle_start, ymd(2024, 1, 1));
        assert_eq!(status.next_period_date, NaiveDate::MAX);
        let window = fertility_window(&cfg, status.current_cycle_start);
        assert!(window.fertile_start <= window.fertile_end);
    }

    #[test]
    fn settings_convert_with_defaults_for_zero_lengths() {
        let settings = CycleSettings {
            last_period_date: Some("2024-01-01T00:00:00.000Z".into()),
            cycle_days: 0,
            menstrual_days: 0,
            notifications_enabled: true,
        };
        let cfg = CycleConfiguration::try_from(&settings).unwrap();
        assert_eq!(cfg, CycleConfiguration::new(ymd(2024, 1, 1), 28, 5));
    }

    #[test]
    fn missing_last_period_is_configuration_missing() {
        let settings = CycleSettings::default();
        assert_eq!(
            compute_cycle_status(&settings, ymd(2024, 1, 1)),
            Err(PredictionError::ConfigurationMissing)
        );
    }

    #[test]
    fn unparseable_last_period_falls_back() {
        let settings = CycleSettings {
            last_period_date: Some("not a date".into()),
            ..CycleSettings::default()
        };
        let today = ymd(2024, 5, 5);
        let status = compute_cycle_status_or_default(Some(&settings), today);
        assert_eq!(status, CycleStatus::fallback(today));
        assert_eq!(status.current_day_in_cycle, 1);
        assert_eq!(status.phase, Phase::Menstruation);
        assert_eq!(status.cycle_length_days, 28);
    }

    #[test]
    fn absent_settings_fall_back() {
        let today = ymd(2024, 5, 5);
        assert_eq!(
            compute_cycle_status_or_default(None, today),
            CycleStatus::fallback(today)
        );
    }

    #[test]
    fn fertility_window_for_28_day_cycle() {
        let fw = fertility_window(&config(), ymd(2024, 1, 1));
        // Cycle day 14
        assert_eq!(fw.ovulation_day, ymd(2024, 1, 14));
        assert_eq!(fw.fertile_start, ymd(2024, 1, 9));
        assert_eq!(fw.peak_start, ymd(2024, 1, 12));
        assert_eq!(fw.fertile_end, fw.ovulation_day);
    }

    #[test]
    fn outlook_uses_latest_logged_start() {
        let log = [ymd(2024, 1, 1), ymd(2024, 1, 30)];
        assert_eq!(
            period_outlook(&config(), &log, ymd(2024, 2, 20)),
            PeriodOutlook::InDays(7)
        );
        assert_eq!(
            period_outlook(&config(), &log, ymd(2024, 2, 26)),
            PeriodOutlook::Tomorrow
        );
        assert_eq!(
            period_outlook(&config(), &log, ymd(2024, 2, 27)),
            PeriodOutlook::StartsToday
        );
        assert_eq!(
            period_outlook(&config(), &log, ymd(2024, 3, 1)),
            PeriodOutlook::Late(3)
        );
    }

    #[test]
    fn outlook_messages() {
        assert_eq!(
            PeriodOutlook::StartsToday.to_string(),
            "Your period is expected to start today"
        );
        assert_eq!(
            PeriodOutlook::InDays(4).to_string(),
            "Your period is expected to start in 4 days"
        );
        assert_eq!(PeriodOutlook::Late(1).to_string(), "Your period is 1 day late");
    }

    #[test]
    fn cycle_stats_computed() {
        let log = vec![ymd(2026, 1, 29), ymd(2026, 1, 1), ymd(2026, 2, 28)];
        let stats = cycle_stats(&log);
        assert_eq!(stats.total_cycles, 3);
        assert_eq!(stats.avg_cycle_length, Some(29.0));
        assert_eq!(stats.shortest_cycle, Some(28));
        assert_eq!(stats.longest_cycle, Some(30));
        assert_eq!(stats.last_period_start, Some(ymd(2026, 2, 28)));
    }

    #[test]
    fn cycle_stats_empty_log() {
        let stats = cycle_stats(&[]);
        assert_eq!(stats.total_cycles, 0);
        assert_eq!(stats.avg_cycle_length, None);
        assert_eq!(stats.last_period_start, None);
    }
}
