use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use nestbin::{Config, Database, PasteForm, PasteRepository, RepositoryOptions};

mod commands;

#[derive(Parser)]
#[command(version, about = "Store and browse pastes")]
struct Args {
    /// Config file (defaults to the per-user config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the paste table if it is missing.
    Init,
    /// Store a new paste, reading its content from a file or stdin.
    Add(commands::add::AddArgs),
    /// Show an active paste with its parent and children.
    Show { id: String },
    /// List active pastes.
    List(commands::list::ListArgs),
    /// Count active pastes.
    Count,
}

pub struct App {
    pub config: Config,
    pub database: Database,
    pub pastes: PasteRepository<PasteForm, Database>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();

    let config = match args.config.or_else(Config::default_path) {
        Some(path) => {
            debug!("loading config from {}", path.display());
            Config::load(&path)?
        }
        None => Config::default(),
    };

    let database = Database::connect(&config.database)
        .await
        .context("failed to open database")?
        .with_key_length(config.keys.length);

    let pastes = PasteRepository::new(
        PasteForm::from_config(&config.form, &config.limits),
        database.clone(),
        RepositoryOptions {
            max_parent_depth: config.limits.max_parent_depth,
        },
    );

    let app = App {
        config,
        database,
        pastes,
    };

    match args.command {
        Command::Init => commands::init::run(app).await,
        Command::Add(add) => commands::add::run(app, add).await,
        Command::Show { id } => commands::show::run(app, &id).await,
        Command::List(list) => commands::list::run(app, list).await,
        Command::Count => commands::count::run(app).await,
    }
}
