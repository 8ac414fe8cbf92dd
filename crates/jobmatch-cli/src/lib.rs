//! jobmatch CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (match, compare, model, config)

pub mod cli;
pub mod commands;

pub use cli::{
    BackendArgs, Cli, Commands, ConfigCommands, EmbedderArg, IndexArg, ModelCommands, OutputFormat,
};
pub use commands::{
    apply_backend_overrides, build_embedder, compare_files, download_model, handle_compare,
    handle_match, init_logging, load_inputs, load_settings, match_files, render_json,
    render_scores_json, render_scores_text, render_text, show_config, show_model_status,
    DIVIDER_WIDTH,
};
