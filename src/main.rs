mod cli;
mod config;
mod logging;
mod report;

use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use bloomcycle::clock::{Clock, FixedClock, SystemClock};
use bloomcycle::commands::Tracker;
use bloomcycle::crypto::Passphrase;
use bloomcycle::dates;
use bloomcycle::storage::EncryptedFileStore;

use crate::cli::{
    CalendarArgs, Cli, Command, LogAction, MedsAction, ReminderAction, SettingsAction,
};
use crate::config::BloomConfig;

type VaultTracker<C> = Tracker<EncryptedFileStore, C>;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = BloomConfig::load(cli.config.as_deref())?;
    match cli.today {
        Some(date) => dispatch(cli, &config, FixedClock::on(date)),
        None => dispatch(cli, &config, SystemClock),
    }
}

fn dispatch<C: Clock>(cli: Cli, config: &BloomConfig, clock: C) -> Result<()> {
    let Some(raw) = cli.passphrase else {
        bail!("a passphrase is required (--passphrase or BLOOMCYCLE_PASSPHRASE)");
    };
    let path = config.vault_path()?;
    let store = EncryptedFileStore::open_or_create(&path, Passphrase::new(raw))
        .with_context(|| format!("failed to open vault at {}", path.display()))?;
    let mut tracker = Tracker::new(store, clock);

    match cli.command {
        Command::Status { json } => status(&tracker, json),
        Command::Calendar(args) => calendar(&tracker, config, args),
        Command::Settings { action } => settings(&mut tracker, action),
        Command::Log { action } => log(&mut tracker, action),
        Command::Stats => {
            print!("{}", report::stats(&tracker.stats()?));
            Ok(())
        }
        Command::Outlook => {
            match tracker.outlook()? {
                Some(outlook) => println!("{outlook}"),
                None => println!("Log a period or save cycle settings to see an outlook."),
            }
            Ok(())
        }
        Command::Reminders { action } => reminders(&mut tracker, config, action),
        Command::Meds { action } => meds(&mut tracker, action),
        Command::Export { output } => {
            let json = tracker.store().export()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "exported vault");
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Command::Wipe { yes } => {
            if !yes {
                bail!("refusing to wipe without --yes");
            }
            tracker.into_store().wipe()?;
            println!("Vault deleted.");
            Ok(())
        }
    }
}

fn status<C: Clock>(tracker: &VaultTracker<C>, json: bool) -> Result<()> {
    let status = tracker.status()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    if tracker.settings()?.is_none() {
        println!("No cycle settings saved; showing defaults.");
    }
    print!("{}", report::status(&status, tracker.fertility()?.as_ref()));
    Ok(())
}

fn calendar<C: Clock>(
    tracker: &VaultTracker<C>,
    config: &BloomConfig,
    args: CalendarArgs,
) -> Result<()> {
    let (marking, grid) = if let Some(month) = args.month {
        let marking = tracker.month_calendar(month.year, month.month)?;
        let grid = dates::month_bounds(month.year, month.month)
            .map(|(first, last)| report::month_grid(first, last, &marking));
        (marking, grid)
    } else {
        let (start, end) = tracker.default_range(config.horizon_months)?;
        let start = args.from.unwrap_or(start);
        let end = args.to.unwrap_or(end);
        (tracker.calendar(start, end)?, None)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&marking)?);
    } else {
        print!("{}", grid.unwrap_or_else(|| report::marking_list(&marking)));
    }
    Ok(())
}

fn settings<C: Clock>(tracker: &mut VaultTracker<C>, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => print!("{}", report::settings(tracker.settings()?.as_ref())),
        SettingsAction::Set {
            last_period,
            cycle_days,
            period_days,
        } => {
            let saved = tracker.update_settings(last_period, cycle_days, period_days)?;
            print!("{}", report::settings(Some(&saved)));
        }
    }
    Ok(())
}

fn log<C: Clock>(tracker: &mut VaultTracker<C>, action: LogAction) -> Result<()> {
    match action {
        LogAction::Add { date } => {
            let date = date.unwrap_or_else(|| tracker.today());
            if tracker.log_period(date)? {
                println!("Logged period starting {date}.");
            } else {
                println!("{date} is already logged.");
            }
        }
        LogAction::Remove { date } => {
            if tracker.remove_period(date)? {
                println!("Removed {date}.");
            } else {
                println!("{date} was not logged.");
            }
        }
        LogAction::List => print!("{}", report::period_log(&tracker.period_log()?)),
    }
    Ok(())
}

fn reminders<C: Clock>(
    tracker: &mut VaultTracker<C>,
    config: &BloomConfig,
    action: ReminderAction,
) -> Result<()> {
    if let ReminderAction::Set {
        all,
        menstrual,
        ovulation,
        ovulation_day,
        ovulation_end,
        time,
    } = action
    {
        let mut settings = tracker.reminder_settings()?;
        settings.enable_all = all.unwrap_or(settings.enable_all);
        settings.menstrual_reminder = menstrual.unwrap_or(settings.menstrual_reminder);
        settings.ovulation_reminder = ovulation.unwrap_or(settings.ovulation_reminder);
        settings.ovulation_day_reminder = ovulation_day.unwrap_or(settings.ovulation_day_reminder);
        settings.ovulation_end_reminder = ovulation_end.unwrap_or(settings.ovulation_end_reminder);
        settings.reminder_time = time.unwrap_or(settings.reminder_time);
        tracker.set_reminder_settings(&settings)?;
    }
    let settings = tracker.reminder_settings()?;
    let planned = tracker.reminders(config.reminder_lead_days)?;
    print!("{}", report::reminders(&settings, &planned));
    Ok(())
}

fn meds<C: Clock>(tracker: &mut VaultTracker<C>, action: MedsAction) -> Result<()> {
    match action {
        MedsAction::Add(args) => {
            let id = tracker.add_medication(&args.name, &args.dosage, args.frequency())?;
            println!("Added {} ({id}).", args.name);
        }
        MedsAction::Take { id } => {
            if !tracker.take_medication(id)? {
                bail!("no medication with id {id}");
            }
            println!("Dose recorded.");
        }
        MedsAction::List => {
            let today = tracker.today();
            print!("{}", report::medications(&tracker.medications()?, today));
        }
        MedsAction::Adherence => {
            println!("{}% of expected doses taken in the last 7 days", tracker.adherence()?);
        }
    }
    Ok(())
}
