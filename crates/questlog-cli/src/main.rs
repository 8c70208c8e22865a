use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "questlog", version, about = "QuestLog CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Task management within a goal
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Record or undo check-ins
    Checkin {
        #[command(subcommand)]
        action: commands::checkin::CheckinAction,
    },
    /// Goals, tasks, and progress for one date
    Today {
        /// Date to view (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Weekly and monthly reviews
    Review {
        #[command(subcommand)]
        action: commands::review::ReviewAction,
    },
    /// Profile and display settings
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Badge catalog with unlock state
    Badges,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Checkin { action } => commands::checkin::run(action),
        Commands::Today { date } => commands::today::run(date),
        Commands::Review { action } => commands::review::run(action),
        Commands::Profile { action } => commands::profile::run(action),
        Commands::Badges => commands::profile::run_badges(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
