//! CLI argument parsing for the jobmatch binary.
//!
//! Flags given here override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use jobmatch_types::{EmbedderKind, IndexKind};

/// Job matcher
///
/// Ranks job postings against a résumé by embedding similarity and drops
/// re-posted duplicates.
#[derive(Parser, Debug)]
#[command(name = "jobmatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/jobmatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank pool documents against a reference and drop near-duplicates
    Match {
        /// Plain-text reference document (e.g. a résumé)
        #[arg(short, long)]
        reference: PathBuf,

        /// Candidate pool as a JSON array or JSON Lines
        #[arg(short, long)]
        pool: PathBuf,

        /// Number of results (default from config)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        backends: BackendArgs,
    },

    /// Print the similarity of the reference to every pool document
    ///
    /// Scores every document exactly, so there is no index choice.
    Compare {
        #[arg(short, long)]
        reference: PathBuf,

        #[arg(short, long)]
        pool: PathBuf,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Embedding backend
        #[arg(long, value_enum)]
        embedder: Option<EmbedderArg>,
    },

    /// Inspect or populate the local model cache
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Backend overrides for `match`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Embedding backend
    #[arg(long, value_enum)]
    pub embedder: Option<EmbedderArg>,

    /// Nearest-neighbor index
    #[arg(long, value_enum)]
    pub index: Option<IndexArg>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommands {
    /// Show cache location and missing model files
    Status,

    /// Download the configured model into the cache
    Download,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective settings as TOML
    Show,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum EmbedderArg {
    /// all-MiniLM-L6-v2 via Candle
    Candle,
    /// Offline feature hashing, no model files
    Hashing,
}

impl From<EmbedderArg> for EmbedderKind {
    fn from(arg: EmbedderArg) -> Self {
        match arg {
            EmbedderArg::Candle => EmbedderKind::Candle,
            EmbedderArg::Hashing => EmbedderKind::Hashing,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum IndexArg {
    /// Exact linear scan
    Flat,
    /// Approximate HNSW graph
    Hnsw,
}

impl From<IndexArg> for IndexKind {
    fn from(arg: IndexArg) -> Self {
        match arg {
            IndexArg::Flat => IndexKind::Flat,
            IndexArg::Hnsw => IndexKind::Hnsw,
        }
    }
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_match_minimal() {
        let cli = Cli::parse_from([
            "jobmatch", "match", "--reference", "resume.txt", "--pool", "jobs.json",
        ]);
        match cli.command {
            Commands::Match {
                reference,
                pool,
                count,
                format,
                backends,
            } => {
                assert_eq!(reference, PathBuf::from("resume.txt"));
                assert_eq!(pool, PathBuf::from("jobs.json"));
                assert_eq!(count, None);
                assert_eq!(format, OutputFormat::Text);
                assert!(backends.embedder.is_none());
                assert!(backends.index.is_none());
            }
            _ => panic!("Expected Match command"),
        }
    }

    #[test]
    fn test_cli_match_all_flags() {
        let cli = Cli::parse_from([
            "jobmatch",
            "match",
            "-r",
            "resume.txt",
            "-p",
            "jobs.jsonl",
            "-n",
            "5",
            "--format",
            "json",
            "--embedder",
            "hashing",
            "--index",
            "hnsw",
        ]);
        match cli.command {
            Commands::Match {
                count,
                format,
                backends,
                ..
            } => {
                assert_eq!(count, Some(5));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(backends.embedder, Some(EmbedderArg::Hashing));
                assert_eq!(backends.index, Some(IndexArg::Hnsw));
            }
            _ => panic!("Expected Match command"),
        }
    }

    #[test]
    fn test_cli_compare() {
        let cli = Cli::parse_from([
            "jobmatch", "compare", "-r", "a.txt", "-p", "b.json", "--embedder", "hashing",
        ]);
        match cli.command {
            Commands::Compare { embedder, .. } => assert_eq!(embedder, Some(EmbedderArg::Hashing)),
            _ => panic!("Expected Compare command"),
        }
    }

    #[test]
    fn test_cli_compare_has_no_index_flag() {
        let result = Cli::try_parse_from([
            "jobmatch", "compare", "-r", "a.txt", "-p", "b.json", "--index", "hnsw",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_model_status() {
        let cli = Cli::parse_from(["jobmatch", "model", "status"]);
        match cli.command {
            Commands::Model { command } => assert!(matches!(command, ModelCommands::Status)),
            _ => panic!("Expected Model command"),
        }
    }

    #[test]
    fn test_cli_config_show_with_globals() {
        let cli = Cli::parse_from([
            "jobmatch",
            "config",
            "show",
            "--config",
            "/path/to/config.toml",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Config { .. }));
    }

    #[test]
    fn test_cli_rejects_unknown_embedder() {
        let result = Cli::try_parse_from([
            "jobmatch", "match", "-r", "a", "-p", "b", "--embedder", "spacy",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_arg_conversions() {
        assert_eq!(EmbedderKind::from(EmbedderArg::Hashing), EmbedderKind::Hashing);
        assert_eq!(IndexKind::from(IndexArg::Flat), IndexKind::Flat);
    }
}
