//! # Scholia - Research Knowledge Base
//!
//! The main binary for the Scholia typed property graph.
//!
//! ## Usage
//!
//! ```bash
//! # Create the database and install the research schema
//! scholia init
//!
//! # Add records and an article
//! scholia add-author --name "Ada Lovelace"
//! scholia add-article -f article.json
//!
//! # Traversals
//! scholia chain --start <entity-id>
//! scholia solutions --problem <problem-id> --json-mode
//! ```

use clap::Parser;
use scholia::cli;
use scholia::config::{Config, LOG_FORMAT_ENV, LogFormat};
use scholia_core::ScholiaError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    init_tracing(&config);

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Defaults, then the config file, then the environment, then flags.
fn load_config(cli: &cli::Cli) -> Result<Config, ScholiaError> {
    let env_format = std::env::var(LOG_FORMAT_ENV).ok();
    let config = Config::load(cli.config.as_deref())?
        .with_log_format_override(env_format.as_deref())?;
    cli.apply(config)
}

fn init_tracing(config: &Config) {
    // RUST_LOG wins over the configured filter.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter.as_str().into());

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
