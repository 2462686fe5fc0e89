use chrono::NaiveDate;
use clap::Subcommand;
use cadence_core::DailySummaryGenerator;

use super::{open, parse_date, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum SummaryAction {
    /// Build and store the summary for a day
    Generate {
        /// Local date (defaults to today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Print only the rendered text
        #[arg(long)]
        text: bool,
    },
    /// Show a previously stored summary
    Show {
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

pub fn run(ctx: &Context, action: SummaryAction) -> CmdResult {
    let (store, config) = open()?;
    let generator = DailySummaryGenerator::new(&config);

    match action {
        SummaryAction::Generate { date, text } => {
            let date = date.unwrap_or_else(|| ctx.today(&config));
            let record = generator.generate_daily_summary(&store, &ctx.owner, date)?;
            if text {
                print!("{}", record.content);
            } else {
                print_json(&record)?;
            }
        }
        SummaryAction::Show { date } => {
            let date = date.unwrap_or_else(|| ctx.today(&config));
            match generator.daily_summary(&store, &ctx.owner, date)? {
                Some(record) => print_json(&record)?,
                None => return Err(format!("no summary stored for {date}").into()),
            }
        }
    }
    Ok(())
}
