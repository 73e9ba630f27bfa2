//! Command-line interface for roomstate
//!
//! Replays room payloads through the normalized store offline: normalize
//! pages, merge states and threads, order message parts and validate a
//! state dump.

use anyhow::Result;
use clap::{Parser, Subcommand};
use roomstate_cli::{commands, config, load_config};
use roomstate_core::{ArrayPolicy, StoreConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roomstate")]
#[command(about = "Roomstate - normalized room state and streaming merge tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path [default: .roomstate/config.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a page payload into {byId, allIds}
    Paginate {
        /// Page JSON ({items, has_next_page, next_cursor}) or an item array
        file: PathBuf,

        /// Build the byName slug index
        #[arg(long)]
        by_name: bool,
    },

    /// Deep-merge SOURCE into TARGET
    Merge {
        /// Base JSON document
        target: PathBuf,

        /// JSON document merged on top
        source: PathBuf,

        /// Array policy (replace | merge-by-index)
        #[arg(long)]
        arrays: Option<ArrayPolicy>,
    },

    /// Merge or replace one collection property of two state objects
    MergeCollection {
        /// Previous state object
        previous: PathBuf,

        /// Incoming state object
        current: PathBuf,

        /// Collection-valued property to reconcile
        #[arg(short, long)]
        property: String,
    },

    /// Merge an incoming thread payload into a previous one
    MergeThread {
        /// Previous thread (raw or normalized)
        previous: PathBuf,

        /// Incoming thread (raw or normalized)
        incoming: PathBuf,

        /// Sequence numbers as APPLIED:INCOMING (needs staleness.enabled)
        #[arg(long, value_parser = parse_sequence)]
        sequence: Option<(u64, u64)>,
    },

    /// Validate a room state dump
    Validate {
        /// Room state JSON
        state: PathBuf,

        /// Exit non-zero when the state is invalid
        #[arg(long)]
        assert: bool,
    },

    /// Print ordered part ids per message
    SortParts {
        /// Part array, messageParts state or room state
        state: PathBuf,

        /// Only this message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show the effective configuration as TOML
    Config,
}

fn parse_sequence(value: &str) -> std::result::Result<(u64, u64), String> {
    let (applied, incoming) = value
        .split_once(':')
        .ok_or_else(|| format!("expected APPLIED:INCOMING, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u64>()
            .map_err(|err| format!("invalid sequence '{part}': {err}"))
    };
    Ok((parse(applied)?, parse(incoming)?))
}

fn init_logging(verbose: bool, config: &StoreConfig) {
    let fallback = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config);
    tracing::debug!(
        explicit = ?cli.config,
        level = %config.logging.level,
        "configuration loaded"
    );

    let output = match cli.command {
        Commands::Paginate { file, by_name } => commands::paginate::run(&file, by_name, &config)?,
        Commands::Merge {
            target,
            source,
            arrays,
        } => commands::merge::run(&target, &source, arrays, &config)?,
        Commands::MergeCollection {
            previous,
            current,
            property,
        } => commands::merge::run_collection(&previous, &current, &property)?,
        Commands::MergeThread {
            previous,
            incoming,
            sequence,
        } => commands::merge::run_thread(&previous, &incoming, sequence, &config)?,
        Commands::Validate { state, assert } => commands::validate::run(&state, assert, &config)?,
        Commands::SortParts { state, message } => {
            commands::parts::run(&state, message.as_deref())?
        }
        Commands::Config => config::render(&config)?,
    };

    println!("{output}");
    Ok(())
}
