use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mingle::logging::{Verbosity, init_subscriber};
use mingle::mingle_config::MingleConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "mingle")]
#[command(version, about = "Card list views, tabs and history subscriptions for Mingle projects")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Project identifier for project-scoped commands
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Login to act as (defaults to the local administrator)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Session whose card navigation state is used
    #[arg(long, default_value = "cli", global = true)]
    pub session: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a .mingle directory and database
    Init,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Import or list projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Card list view parameters
    View {
        #[command(subcommand)]
        command: ViewCommands,
    },
    /// List cards and navigate between them
    Cards {
        #[command(subcommand)]
        command: CardsCommands,
    },
    /// Project navigation tabs
    Tabs {
        #[command(subcommand)]
        command: TabsCommands,
    },
    /// Saved views and pages
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
    /// History feed tokens and subscriptions
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default mingle.toml file
    Init,
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    /// Import a project, its users, cards and pages from a JSON file
    Import { file: PathBuf },
    /// List projects
    List,
}

#[derive(Subcommand, Clone)]
pub enum ViewCommands {
    /// Normalize card list parameters and print their encodings
    Normalize {
        /// Query string, e.g. "style=grid&filters[]=[Type][is][Bug]"
        query: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum CardsCommands {
    /// List cards under a tab
    List {
        /// Tab name (defaults to All)
        #[arg(short, long)]
        tab: Option<String>,
        /// Query string; omitted to reuse the tab's last view
        query: Option<String>,
    },
    /// Show a card with its list navigation
    Show {
        number: u32,
        /// Origin when not coming from a card list: history, search:<query> or page:<identifier>
        #[arg(long)]
        from: Option<String>,
    },
    /// Leave the current card list
    Leave,
}

#[derive(Subcommand, Clone)]
pub enum TabsCommands {
    /// List tabs in display order
    List,
    /// Rename a user tab
    Rename { identifier: String, name: String },
    /// Store a new tab order
    Reorder {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Promote a team favorite to a tab
    Promote { favorite_id: i64 },
    /// Turn a tab back into a team favorite
    Demote { identifier: String },
}

#[derive(Subcommand, Clone)]
pub enum FavoritesCommands {
    /// List favorites visible to the user
    List,
    /// Save a card list view
    Save {
        name: String,
        query: String,
        /// Save for the current user only
        #[arg(long)]
        personal: bool,
    },
    /// Favorite a wiki page
    Page {
        identifier: String,
        /// Show the page as a tab
        #[arg(long)]
        tab: bool,
    },
    /// Delete a favorite
    Delete { id: i64 },
}

#[derive(Subcommand, Clone)]
pub enum HistoryCommands {
    /// Encrypt a history filter into a feed token
    Token { query: String },
    /// Decrypt a feed token
    Decode { token: String },
    /// Subscribe to a history filter
    Subscribe { query: String },
    /// Remove a subscription
    Unsubscribe { id: i64 },
    /// List the user's subscriptions
    Subscriptions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = MingleConfig::new(project_dir.clone())?;
    init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet), config.log_level());

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
        Commands::Project { command } => cmd::cmd_project(&config, command.clone())?,
        Commands::View { command } => cmd::cmd_view(&config, &cli, command.clone())?,
        Commands::Cards { command } => cmd::cmd_cards(&config, &cli, command.clone())?,
        Commands::Tabs { command } => cmd::cmd_tabs(&config, &cli, command.clone())?,
        Commands::Favorites { command } => cmd::cmd_favorites(&config, &cli, command.clone())?,
        Commands::History { command } => cmd::cmd_history(&config, &cli, command.clone())?,
    }

    Ok(())
}
