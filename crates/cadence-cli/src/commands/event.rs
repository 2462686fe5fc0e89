use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use cadence_core::{Interval, IntervalKind, IntervalStore};

use super::{parse_datetime, print_json, CmdResult, Context};

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Event,
    Task,
    Break,
    Travel,
}

impl From<KindArg> for IntervalKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Event => IntervalKind::Event,
            KindArg::Task => IntervalKind::Task,
            KindArg::Break => IntervalKind::Break,
            KindArg::Travel => IntervalKind::Travel,
        }
    }
}

#[derive(Subcommand)]
pub enum EventAction {
    /// Add an interval to the owner's calendar
    Add {
        title: String,
        #[arg(long, value_enum, default_value = "event")]
        kind: KindArg,
        /// Start (RFC 3339); for tasks, the due time
        #[arg(long, value_parser = parse_datetime)]
        start: DateTime<Utc>,
        /// End (RFC 3339); defaults to the start
        #[arg(long, value_parser = parse_datetime)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        location: Option<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        priority: Option<i32>,
        /// Exempt from wind-down checks
        #[arg(long)]
        protected: bool,
    },
    /// List intervals starting at or after the reference time
    List,
}

pub fn run(ctx: &Context, action: EventAction) -> CmdResult {
    let store = cadence_core::SqliteStore::open()?;

    match action {
        EventAction::Add {
            title,
            kind,
            start,
            end,
            location,
            tags,
            priority,
            protected,
        } => {
            let mut interval =
                Interval::new(ctx.owner.as_str(), kind.into(), title, start, end.unwrap_or(start))?.with_tags(tags);
            if let Some(location) = location {
                interval = interval.with_location(location);
            }
            if let Some(priority) = priority {
                interval = interval.with_priority(priority);
            }
            if protected {
                interval = interval.protected();
            }
            store.insert_interval(&interval)?;
            print_json(&interval)?;
        }
        EventAction::List => {
            print_json(&store.intervals_starting_from(&ctx.owner, ctx.now)?)?;
        }
    }
    Ok(())
}
