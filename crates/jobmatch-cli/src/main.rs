//! jobmatch
//!
//! Ranks job postings against a résumé and drops duplicate re-posts.
//!
//! # Usage
//!
//! ```bash
//! jobmatch match --reference resume.txt --pool jobs.json [--count N] [--format json]
//! jobmatch compare --reference resume.txt --pool jobs.json
//! jobmatch model status|download
//! jobmatch config show
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/jobmatch/config.toml)
//! 3. Environment variables (JOBMATCH_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use jobmatch_cli::{
    download_model, handle_compare, handle_match, init_logging, load_settings, show_config,
    show_model_status, Cli, Commands, ConfigCommands, ModelCommands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Match {
            reference,
            pool,
            count,
            format,
            backends,
        } => {
            handle_match(settings, &reference, &pool, count, format, &backends).await?;
        }
        Commands::Compare {
            reference,
            pool,
            format,
            embedder,
        } => {
            handle_compare(settings, &reference, &pool, format, embedder).await?;
        }
        Commands::Model { command } => match command {
            ModelCommands::Status => show_model_status(&settings)?,
            ModelCommands::Download => download_model(&settings).await?,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(&settings)?,
        },
    }

    Ok(())
}
