use std::path::PathBuf;
use std::str::FromStr;

use bloomcycle::models::Frequency;
use chrono::{NaiveDate, NaiveTime, Weekday};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

/// Private, on-device cycle tracker.
#[derive(Parser)]
#[command(name = "bloomcycle", version, about = "Private, on-device cycle tracker")]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault passphrase.
    #[arg(long, global = true, env = "BLOOMCYCLE_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Current cycle day, phase and next period.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Logged and predicted period days.
    Calendar(CalendarArgs),
    /// Show or change cycle settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Manage logged period start dates.
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
    /// Cycle length statistics from the period log.
    Stats,
    /// When the next period is expected, relative to today.
    Outlook,
    /// Show or change reminder settings.
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },
    /// Track medications.
    Meds {
        #[command(subcommand)]
        action: MedsAction,
    },
    /// Write every stored entry as plain JSON.
    Export {
        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete the vault permanently.
    Wipe {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct CalendarArgs {
    /// First date of the range.
    #[arg(long, conflicts_with = "month")]
    pub from: Option<NaiveDate>,

    /// Last date of the range.
    #[arg(long, conflicts_with = "month")]
    pub to: Option<NaiveDate>,

    /// Show one month (YYYY-MM).
    #[arg(long)]
    pub month: Option<YearMonth>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    Show,
    Set {
        /// Start date of the most recent period.
        #[arg(long)]
        last_period: NaiveDate,

        /// Average cycle length in days (21-35).
        #[arg(long, default_value_t = bloomcycle::models::DEFAULT_CYCLE_DAYS)]
        cycle_days: u32,

        /// Average period length in days (1-10).
        #[arg(long, default_value_t = bloomcycle::models::DEFAULT_MENSTRUAL_DAYS)]
        period_days: u32,
    },
}

#[derive(Subcommand)]
pub enum LogAction {
    /// Log a period start. Defaults to today.
    Add { date: Option<NaiveDate> },
    Remove { date: NaiveDate },
    List,
}

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Settings and the upcoming schedule.
    Show,
    Set {
        #[arg(long)]
        all: Option<bool>,
        #[arg(long)]
        menstrual: Option<bool>,
        #[arg(long)]
        ovulation: Option<bool>,
        #[arg(long)]
        ovulation_day: Option<bool>,
        #[arg(long)]
        ovulation_end: Option<bool>,
        /// Time of day (HH:MM).
        #[arg(long, value_parser = parse_time)]
        time: Option<NaiveTime>,
    },
}

#[derive(Subcommand)]
pub enum MedsAction {
    Add(MedAddArgs),
    /// Record a dose taken today.
    Take { id: Uuid },
    List,
    /// Share of expected doses taken in the last seven days.
    Adherence,
}

#[derive(Args)]
pub struct MedAddArgs {
    pub name: String,

    #[arg(long, default_value = "")]
    pub dosage: String,

    /// Due every N days.
    #[arg(long, conflicts_with_all = ["weekdays", "day_of_month"])]
    pub every_n_days: Option<u32>,

    /// Due on these weekdays (e.g. mon,thu).
    #[arg(long, value_delimiter = ',', conflicts_with = "day_of_month")]
    pub weekdays: Vec<Weekday>,

    /// Due on this day of each month.
    #[arg(long)]
    pub day_of_month: Option<u32>,
}

impl MedAddArgs {
    /// Daily unless another schedule was given.
    pub fn frequency(&self) -> Frequency {
        if let Some(interval) = self.every_n_days {
            Frequency::EveryNDays { interval }
        } else if !self.weekdays.is_empty() {
            Frequency::Weekly {
                days_of_week: self.weekdays.clone(),
            }
        } else if let Some(day_of_month) = self.day_of_month {
            Frequency::Monthly { day_of_month }
        } else {
            Frequency::Daily
        }
    }
}

/// A calendar month given as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year = year.parse().map_err(|_| format!("invalid year '{year}'"))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month '{month}'"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month must be 1-12, got {month}"));
        }
        Ok(Self { year, month })
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}
