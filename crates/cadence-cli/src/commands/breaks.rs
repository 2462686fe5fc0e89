use chrono::NaiveDate;
use clap::Subcommand;
use cadence_core::{BreakPreference, BreakScheduler, IntervalStore};

use super::{open, parse_date, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum BreaksAction {
    /// Insert breaks into the day's long work stretches
    Schedule {
        /// Local date (defaults to today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Show or update the break cadence
    Prefs {
        /// Work minutes before a break is due
        #[arg(long)]
        interval: Option<i64>,
        /// Break length in minutes
        #[arg(long)]
        duration: Option<i64>,
    },
}

pub fn run(ctx: &Context, action: BreaksAction) -> CmdResult {
    let (store, config) = open()?;

    match action {
        BreaksAction::Schedule { date } => {
            let date = date.unwrap_or_else(|| ctx.today(&config));
            let breaks = BreakScheduler::new(&config).schedule_smart_breaks(&store, &ctx.owner, date)?;
            print_json(&breaks)?;
        }
        BreaksAction::Prefs { interval, duration } => {
            let current = store
                .break_preference(&ctx.owner)?
                .unwrap_or_else(|| BreakPreference::from_defaults(ctx.owner.as_str(), &config.breaks));

            if interval.is_none() && duration.is_none() {
                print_json(&current)?;
                return Ok(());
            }

            let updated = BreakPreference::new(
                ctx.owner.as_str(),
                interval.unwrap_or(current.interval_minutes),
                duration.unwrap_or(current.duration_minutes),
            )?;
            store.set_break_preference(&updated)?;
            print_json(&updated)?;
        }
    }
    Ok(())
}
