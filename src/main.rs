//! # ExpertAgent CLI (`expertagent`)
//!
//! ## Usage
//!
//! ```bash
//! expertagent --config ./config/expertagent.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `expertagent init` | Create the SQLite database and run schema migrations |
//! | `expertagent seed` | Insert the sample learning resources |
//! | `expertagent resources` | List the resource catalog |
//! | `expertagent rank <keywords...>` | Rank the catalog against keywords |
//! | `expertagent chat "<message>"` | Run one chat turn |
//! | `expertagent serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use expert_agent::{catalog, chat, config, migrate, server};

/// ExpertAgent CLI — an educational chat backend with resource ranking.
#[derive(Parser)]
#[command(
    name = "expertagent",
    about = "ExpertAgent — an educational chat backend with resource ranking",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/expertagent.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all tables. Also upgrades an
    /// older `learning_resources` table with any missing columns. Idempotent.
    Init,

    /// Insert the sample learning resources into an empty catalog.
    Seed,

    /// List every learning resource in the catalog.
    Resources,

    /// Rank the catalog against keywords without calling the model.
    Rank {
        /// Keywords, matched case-insensitively against topic and content.
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Number of results to print (defaults to `[chat].resource_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Send one message through the chat pipeline and print the reply.
    Chat {
        /// The student's message.
        message: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Seed => {
            catalog::run_seed(&cfg).await?;
        }
        Commands::Resources => {
            catalog::run_list(&cfg).await?;
        }
        Commands::Rank { keywords, limit } => {
            catalog::run_rank(&cfg, &keywords, limit).await?;
        }
        Commands::Chat { message } => {
            chat::run_chat(&cfg, &message).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
