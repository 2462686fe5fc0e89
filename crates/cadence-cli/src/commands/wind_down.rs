use chrono::NaiveTime;
use clap::Subcommand;
use cadence_core::{WindDownEnforcer, WindDownSettings};

use super::{open, parse_time, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum WindDownAction {
    /// Report events inside tonight's wind-down window
    Check,
    /// Configure bedtime and wind-down length
    Set {
        /// Local bedtime, HH:MM
        #[arg(long, value_parser = parse_time)]
        sleep: NaiveTime,
        /// Minutes before bedtime kept free
        #[arg(long, default_value_t = 60)]
        duration: i64,
        /// Store the settings but turn enforcement off
        #[arg(long)]
        inactive: bool,
    },
}

pub fn run(ctx: &Context, action: WindDownAction) -> CmdResult {
    let (store, config) = open()?;

    match action {
        WindDownAction::Check => {
            let report = WindDownEnforcer::new(&config).enforce_wind_down_rules(&store, &ctx.owner, ctx.now)?;
            print_json(&report)?;
        }
        WindDownAction::Set { sleep, duration, inactive } => {
            let mut settings = WindDownSettings::new(ctx.owner.as_str(), sleep, duration)?;
            settings.is_active = !inactive;
            store.set_wind_down_settings(&settings)?;
            print_json(&settings)?;
        }
    }
    Ok(())
}
