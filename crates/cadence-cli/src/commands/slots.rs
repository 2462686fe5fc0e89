use clap::Subcommand;
use cadence_core::SlotFinder;

use super::{open, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum SlotsAction {
    /// Ranked free slots between upcoming intervals
    Suggest {
        /// Required length in minutes
        #[arg(long, default_value_t = 60, allow_negative_numbers = true)]
        duration: i64,
        /// Kind of task being placed (e.g. "deep_work")
        #[arg(long)]
        task_type: Option<String>,
    },
    /// Common slot for a group of participants
    Meeting {
        /// Participant id (repeatable)
        #[arg(long = "participant", required = true)]
        participants: Vec<String>,
        /// Meeting length in minutes
        #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
        duration: i64,
    },
}

pub fn run(ctx: &Context, action: SlotsAction) -> CmdResult {
    let (store, config) = open()?;
    let finder = SlotFinder::new(&config);

    match action {
        SlotsAction::Suggest { duration, task_type } => {
            let slots = finder.suggest_optimal_time(
                &store,
                &ctx.owner,
                task_type.as_deref(),
                duration,
                ctx.now,
            )?;
            print_json(&slots)?;
        }
        SlotsAction::Meeting { participants, duration } => {
            let slot = finder.find_optimal_meeting_time(&participants, duration)?;
            print_json(&slot)?;
        }
    }
    Ok(())
}
