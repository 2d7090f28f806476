//! # Skincare RAG CLI (`skinrag`)
//!
//! ## Usage
//!
//! ```bash
//! skinrag --config ./config/skinrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skinrag index` | Load the persisted index, or build it from the documents |
//! | `skinrag status` | Print the persisted index manifest |
//! | `skinrag search "<query>"` | Raw retrieval: source, score and excerpt per hit |
//! | `skinrag recommend --skin-type oily --concern acne` | One-shot recommendation as JSON |
//! | `skinrag serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Rebuild the index from ./Data
//! skinrag index --force
//!
//! # Recommendation from a saved questionnaire, with extra logging
//! skinrag -v recommend --profile ./me.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use skincare_rag::config;
use skincare_rag::logging::init_logging;
use skincare_rag::models::{SkinConcern, SkinType};
use skincare_rag::recommend::{build_profile, ProfileArgs};
use skincare_rag::{index_cmd, recommend, search, server};

/// Grounded skincare recommendations from a local dermatology corpus.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/skinrag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "skinrag",
    about = "Grounded skincare recommendations from a local dermatology corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/skinrag.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG`
    /// overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the persisted index, or build it from the documents.
    Index {
        /// Skip loading and always rebuild from the documents.
        #[arg(long)]
        force: bool,

        /// Only count documents and chunks; embed and write nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the persisted index manifest.
    Status,

    /// Retrieve the chunks closest to a query.
    Search {
        query: String,

        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Generate a recommendation and print it as JSON.
    Recommend {
        /// One of oily, dry, sensitive, combination, normal.
        #[arg(long)]
        skin_type: Option<SkinType>,

        /// Repeatable, e.g. `--concern acne --concern dark_spots`.
        #[arg(long = "concern")]
        concerns: Vec<SkinConcern>,

        /// Questionnaire JSON file; flags override its fields.
        #[arg(long)]
        profile: Option<PathBuf>,

        #[arg(long)]
        allergies: Option<String>,

        /// Prefer natural ingredients.
        #[arg(long)]
        natural: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { force, dry_run } => {
            index_cmd::run_index(&cfg, force, dry_run).await?;
        }
        Commands::Status => {
            index_cmd::run_status(&cfg).await?;
        }
        Commands::Search { query, k } => {
            search::run_search(&cfg, &query, k).await?;
        }
        Commands::Recommend {
            skin_type,
            concerns,
            profile,
            allergies,
            natural,
        } => {
            let profile = build_profile(
                profile.as_deref(),
                ProfileArgs {
                    skin_type,
                    concerns,
                    allergies,
                    natural,
                },
            )?;
            recommend::run_recommend(&cfg, profile).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
