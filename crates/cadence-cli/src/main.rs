use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cadence-cli", version, about = "Cadence scheduling intelligence CLI")]
struct Cli {
    /// Owner whose calendar and settings are used
    #[arg(long, global = true, default_value = "default")]
    owner: String,

    /// Reference time instead of the current clock (RFC 3339)
    #[arg(long, global = true, value_parser = commands::parse_datetime)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Free-slot suggestions
    Slots {
        #[command(subcommand)]
        action: commands::slots::SlotsAction,
    },
    /// Automatic break scheduling
    Breaks {
        #[command(subcommand)]
        action: commands::breaks::BreaksAction,
    },
    /// Burnout risk analysis
    Burnout {
        #[command(subcommand)]
        action: commands::burnout::BurnoutAction,
    },
    /// Pre-sleep wind-down rules
    WindDown {
        #[command(subcommand)]
        action: commands::wind_down::WindDownAction,
    },
    /// Habit logging and consistency
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Group scheduling polls
    Poll {
        #[command(subcommand)]
        action: commands::poll::PollAction,
    },
    /// Daily summary
    Summary {
        #[command(subcommand)]
        action: commands::summary::SummaryAction,
    },
    /// Calendar events and tasks
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context {
        owner: cli.owner,
        now: cli.now.unwrap_or_else(Utc::now),
    };
    tracing::debug!(owner = %ctx.owner, now = %ctx.now, "dispatching command");

    let result = match cli.command {
        Commands::Slots { action } => commands::slots::run(&ctx, action),
        Commands::Breaks { action } => commands::breaks::run(&ctx, action),
        Commands::Burnout { action } => commands::burnout::run(&ctx, action),
        Commands::WindDown { action } => commands::wind_down::run(&ctx, action),
        Commands::Habit { action } => commands::habit::run(&ctx, action),
        Commands::Poll { action } => commands::poll::run(&ctx, action),
        Commands::Summary { action } => commands::summary::run(&ctx, action),
        Commands::Event { action } => commands::event::run(&ctx, action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
