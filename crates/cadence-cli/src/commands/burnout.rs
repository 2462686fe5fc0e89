use clap::Subcommand;
use cadence_core::BurnoutAssessor;

use super::{open, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum BurnoutAction {
    /// Analyze the trailing week and store today's result
    Analyze,
    /// Stored analyses, most recent first
    History {
        /// Number of days to look back
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

pub fn run(ctx: &Context, action: BurnoutAction) -> CmdResult {
    let (store, config) = open()?;
    let assessor = BurnoutAssessor::new(&config);

    match action {
        BurnoutAction::Analyze => {
            let record = assessor.analyze_burnout_risk(&store, &ctx.owner, ctx.now)?;
            print_json(&record)?;
        }
        BurnoutAction::History { days } => {
            let history = assessor.burnout_history(&store, &ctx.owner, days, ctx.now)?;
            print_json(&history)?;
        }
    }
    Ok(())
}
