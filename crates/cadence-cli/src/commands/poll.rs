use chrono::{DateTime, Utc};
use clap::Subcommand;
use cadence_core::{IntervalStore, PollAggregator, SlotId};

use super::{open, parse_span, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum PollAction {
    /// Propose candidate slots to a group
    Create {
        title: String,
        /// Candidate slot as START/END in RFC 3339 (repeatable)
        #[arg(long = "slot", required = true, value_parser = parse_span)]
        slots: Vec<(DateTime<Utc>, DateTime<Utc>)>,
        /// Meeting length in minutes
        #[arg(long, default_value_t = 30)]
        duration: i64,
    },
    /// Vote for one or more slots as the current owner
    Vote {
        poll_id: String,
        /// Slot id (repeatable)
        #[arg(long = "slot", required = true)]
        slots: Vec<SlotId>,
    },
    /// Slot vote counts, most popular first
    Results { poll_id: String },
    /// Show one poll, or list the owner's polls
    Show { poll_id: Option<String> },
}

pub fn run(ctx: &Context, action: PollAction) -> CmdResult {
    let (store, _config) = open()?;
    let polls = PollAggregator::new();

    match action {
        PollAction::Create { title, slots, duration } => {
            let poll = polls.create_poll(&store, &ctx.owner, &title, &slots, duration, ctx.now)?;
            print_json(&poll)?;
        }
        PollAction::Vote { poll_id, slots } => {
            let vote = polls.vote(&store, &poll_id, &ctx.owner, &slots, ctx.now)?;
            print_json(&vote)?;
        }
        PollAction::Results { poll_id } => {
            print_json(&polls.get_results(&store, &poll_id)?)?;
        }
        PollAction::Show { poll_id: Some(poll_id) } => match store.poll(&poll_id)? {
            Some(poll) => print_json(&poll)?,
            None => return Err(format!("poll not found: {poll_id}").into()),
        },
        PollAction::Show { poll_id: None } => {
            print_json(&store.list_polls(Some(&ctx.owner))?)?;
        }
    }
    Ok(())
}
