use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use metamirror_core::MetamirrorConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "metamirror",
    version,
    about = "Typed mirrors of key/value metadata tables"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(
        short,
        long,
        global = true,
        env = "METAMIRROR_CONFIG",
        default_value = "metamirror.yaml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the configuration and list the mirrors it declares.
    Check,

    /// Print every statement a commit would run, without touching the store.
    Plan {
        /// Print the plan as JSON instead of a SQL script.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Create, backfill and attach triggers for every declared mirror.
    Commit,

    /// Parse a query and print what the parser understood, as JSON.
    Parse {
        /// The SQL query.
        query: String,
    },

    /// Print a query as it would be sent to the store.
    Rewrite {
        /// The SQL query.
        query: String,

        /// Print the routing decision as JSON.
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Parse { query } => {
            init_tracing("info");
            commands::parse::run(&query)
        }
        Command::Check => commands::check::run(&setup(&cli.config)?),
        Command::Plan { json } => commands::plan::run(&setup(&cli.config)?, json),
        Command::Commit => commands::commit::run(&setup(&cli.config)?).await,
        Command::Rewrite { query, explain } => {
            commands::rewrite::run(&setup(&cli.config)?, &query, explain)
        }
    }
}

/// Load the configuration and install logging at its level.
fn setup(path: &Path) -> anyhow::Result<MetamirrorConfig> {
    let config = commands::load_config(path)?;
    init_tracing(&config.log.level);
    tracing::debug!(config = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Logs go to stderr so command output can be piped. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
