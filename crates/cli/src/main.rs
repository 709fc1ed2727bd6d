use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::App;
use config::TownConfig;

#[derive(Parser)]
#[command(name = "town")]
#[command(about = "Local flow graph, milestones and daily plans for town networks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (default: ./town.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file (overrides data_path from config)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Town to operate on (overrides default_town from config)
    #[arg(long, global = true)]
    town: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record observed customer flow from one category to another
    Record(RecordArgs),

    /// List the town's flow edges, heaviest first
    Edges(OutputArgs),

    /// Show the dominant local flow chain
    Chain(ChainArgs),

    /// Show active businesses and unlocked features
    Milestones(OutputArgs),

    /// Add or update a business membership (creates the town if needed)
    Join(JoinArgs),

    /// Mark a business inactive
    Leave(LeaveArgs),

    /// Resolve season tags for a date
    Season(SeasonArgs),

    /// Manage manual season overrides
    Override(OverrideArgs),

    /// Resolve the current route window
    Window(WindowArgs),

    /// Compose today's recommendation pack
    Plan(PlanArgs),

    /// Print the JSON schema of the recommendation pack
    Schema,
}

impl Commands {
    /// Commands that write the snapshot and must hold its lock.
    fn writes_snapshot(&self) -> bool {
        match self {
            Commands::Record(_) | Commands::Join(_) | Commands::Leave(_) => true,
            Commands::Override(args) => !matches!(args.action, OverrideAction::List),
            _ => false,
        }
    }
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RecordArgs {
    pub from: String,
    pub to: String,

    /// Record the transition this many times
    #[arg(long, default_value_t = 1)]
    pub times: u32,

    /// Business that observed the transition; hidden or inactive
    /// businesses don't contribute
    #[arg(long)]
    pub business: Option<String>,
}

#[derive(Args)]
pub struct ChainArgs {
    /// Maximum chain length (default from config)
    #[arg(long)]
    pub max_length: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct JoinArgs {
    pub business_id: String,

    /// standard, leader or hidden
    #[arg(long, default_value = "standard")]
    pub level: String,
}

#[derive(Args)]
pub struct LeaveArgs {
    pub business_id: String,
}

#[derive(Args)]
pub struct SeasonArgs {
    /// Date to resolve for (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct OverrideArgs {
    #[command(subcommand)]
    pub action: OverrideAction,
}

#[derive(Subcommand)]
pub enum OverrideAction {
    /// Pin a season to a manual window
    Set {
        season: String,
        /// Window start (YYYY-MM-DD); omit for open-ended
        #[arg(long)]
        start: Option<String>,
        /// Window end (YYYY-MM-DD); omit for open-ended
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Force a season off regardless of the calendar
    Off {
        season: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove the override and return to auto-detection
    Clear { season: String },
    /// List overrides for the town
    List,
}

#[derive(Args)]
pub struct WindowArgs {
    /// Local timestamp to bucket (YYYY-MM-DDTHH:MM, default now)
    #[arg(long)]
    pub at: Option<String>,

    /// Explicit window (morning, lunch, after_work, evening, weekend, auto)
    #[arg(long = "override")]
    pub window_override: Option<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[arg(long)]
    pub special: Option<String>,
    #[arg(long)]
    pub post: Option<String>,
    #[arg(long)]
    pub sign: Option<String>,

    #[arg(long)]
    pub local_boost: Option<String>,
    #[arg(long)]
    pub town_boost: Option<String>,
    #[arg(long)]
    pub story: Option<String>,
    #[arg(long)]
    pub graph_boost: Option<String>,
    #[arg(long)]
    pub micro_route: Option<String>,
    #[arg(long)]
    pub seasonal_boost: Option<String>,

    /// Local timestamp to plan for (YYYY-MM-DDTHH:MM, default now)
    #[arg(long)]
    pub at: Option<String>,

    /// Explicit route window
    #[arg(long = "window")]
    pub window_override: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Commands::Schema = cli.command {
        return commands::print_schema();
    }

    let mut config = TownConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    let app = App::open(config, cli.town, cli.command.writes_snapshot()).await?;

    match cli.command {
        Commands::Record(args) => app.record(args).await,
        Commands::Edges(args) => app.edges(args).await,
        Commands::Chain(args) => app.chain(args).await,
        Commands::Milestones(args) => app.milestones(args).await,
        Commands::Join(args) => app.join(args).await,
        Commands::Leave(args) => app.leave(args).await,
        Commands::Season(args) => app.season(args).await,
        Commands::Override(args) => app.override_season(args.action).await,
        Commands::Window(args) => app.window(args),
        Commands::Plan(args) => app.plan(args).await,
        Commands::Schema => commands::print_schema(),
    }
}
