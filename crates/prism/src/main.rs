//! Prism CLI - turn images into text prompts.
//!
//! Prism captions an image, ranks curated vocabularies (artists, mediums,
//! movements, flavors) against its CLIP embedding, and assembles the
//! best-scoring prompt within the text encoder's token budget.
//!
//! # Usage
//!
//! ```bash
//! # Interrogate a single image
//! prism interrogate cat.jpg
//!
//! # Interrogate a directory with the fast mode, as JSON lines
//! prism interrogate ./photos/ --mode fast --json
//!
//! # Score candidate prompts against an image
//! prism score cat.jpg "a photo of a cat" "a photo of a dog"
//!
//! # View configuration
//! prism config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Prism - turn images into text prompts with CLIP label ranking.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate prompts for one image or a directory of images
    Interrogate(cli::interrogate::InterrogateArgs),

    /// Score text candidates against an image
    Score(cli::score::ScoreArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match prism_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `prism config path`."
            );
            prism_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Prism v{}", prism_core::VERSION);

    match cli.command {
        Commands::Interrogate(args) => cli::interrogate::execute(args, config).await,
        Commands::Score(args) => cli::score::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
