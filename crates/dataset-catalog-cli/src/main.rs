// crates/dataset-catalog-cli/src/main.rs
// ============================================================================
// Module: Dataset Catalog CLI Entry Point
// Description: Command dispatcher for catalog reads, updates, and maintenance.
// Purpose: Drive the sync engine from the shell with JSON on stdout.
// Dependencies: clap, dataset-catalog-cli, dataset-catalog-config, dataset-catalog-core
// ============================================================================

//! ## Overview
//! Every command loads configuration, opens the catalog, performs one
//! operation, and prints its result as JSON on stdout. Errors go to stderr
//! and produce a non-zero exit code. Inputs are untrusted: patch files are
//! size-limited and patches are validated by the engine before any write.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use dataset_catalog_cli::CatalogEngine;
use dataset_catalog_cli::init_logging;
use dataset_catalog_cli::open_catalog;
use dataset_catalog_cli::output::ReindexView;
use dataset_catalog_cli::output::StatsView;
use dataset_catalog_cli::output::StatusView;
use dataset_catalog_config::CatalogConfig;
use dataset_catalog_core::DatasetId;
use dataset_catalog_core::RecordPatch;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a patch file passed with `update --input`.
const MAX_PATCH_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "dataset-catalog", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to dataset-catalog.toml or `DATASET_CATALOG_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List every record in creation order.
    List,
    /// Show the most recently updated records.
    Latest(LatestCommand),
    /// Search names, descriptions, and tags.
    Search(SearchCommand),
    /// Fetch one record by id.
    Get(GetCommand),
    /// Create or update a record.
    Update(UpdateCommand),
    /// Rebuild the search index from the record store.
    Reindex,
    /// Show collection statistics.
    Stats,
    /// Report store readiness and index freshness.
    Status,
}

/// Arguments for `latest`.
#[derive(Args, Debug)]
struct LatestCommand {
    /// Number of records to return.
    #[arg(long, value_name = "N")]
    count: Option<usize>,
}

/// Arguments for `search`.
#[derive(Args, Debug)]
struct SearchCommand {
    /// Text to match; empty matches everything.
    #[arg(value_name = "TEXT")]
    text: String,
    /// Maximum number of results.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

/// Arguments for `get`.
#[derive(Args, Debug)]
struct GetCommand {
    /// Record identifier.
    #[arg(value_name = "ID")]
    id: DatasetId,
}

/// Arguments for `update`.
///
/// Flags override the matching fields of `--input`.
#[derive(Args, Debug, Default)]
struct UpdateCommand {
    /// Record to update; omitted or unknown ids create a new record.
    #[arg(long, value_name = "ID")]
    id: Option<DatasetId>,
    /// Dataset name.
    #[arg(long)]
    name: Option<String>,
    /// Location of the cleaned file.
    #[arg(long, value_name = "URL")]
    drive_url: Option<String>,
    /// Free-text description.
    #[arg(long)]
    description: Option<String>,
    /// Row count of the cleaned file.
    #[arg(long, value_name = "N")]
    rows: Option<u64>,
    /// Column name; repeat to give the full list.
    #[arg(long = "column", value_name = "NAME")]
    columns: Vec<String>,
    /// Tag; repeat to give the full list.
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,
    /// JSON patch file to start from.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a printable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Loads configuration, opens the catalog, and dispatches the command.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = CatalogConfig::load_or_default(cli.config.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;
    init_logging(&config.logging).map_err(|err| CliError::new(err.to_string()))?;
    let engine = open_catalog(&config).map_err(|err| CliError::new(err.to_string()))?;
    dispatch(&engine, cli.command)
}

/// Executes one command against an open catalog.
fn dispatch(engine: &CatalogEngine, command: Commands) -> CliResult<ExitCode> {
    let query = engine.query();
    match command {
        Commands::List => write_json(&query.list_all().map_err(engine_error)?)?,
        Commands::Latest(command) => {
            write_json(&query.latest(command.count).map_err(engine_error)?)?;
        }
        Commands::Search(command) => {
            write_json(&query.search(&command.text, command.limit).map_err(engine_error)?)?;
        }
        Commands::Get(command) => write_json(&query.get_by_id(command.id).map_err(engine_error)?)?,
        Commands::Update(command) => {
            let patch = build_patch(command)?;
            write_json(&engine.apply_update(patch).map_err(engine_error)?)?;
        }
        Commands::Reindex => {
            let indexed = engine.reconcile().map_err(engine_error)?;
            write_json(&ReindexView {
                indexed,
                freshness: engine.freshness(),
            })?;
        }
        Commands::Stats => write_json(&StatsView::from(query.stats().map_err(engine_error)?))?,
        Commands::Status => {
            let status = StatusView::from(engine.health());
            write_json(&status)?;
            if !status.healthy {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Update Input
// ============================================================================

/// Builds a patch from `--input` and the individual flags.
fn build_patch(command: UpdateCommand) -> CliResult<RecordPatch> {
    let mut patch = match &command.input {
        Some(path) => read_patch(path)?,
        None => RecordPatch::default(),
    };
    if command.id.is_some() {
        patch.id = command.id;
    }
    if command.name.is_some() {
        patch.name = command.name;
    }
    if command.drive_url.is_some() {
        patch.drive_url = command.drive_url;
    }
    if command.description.is_some() {
        patch.description = command.description;
    }
    if command.rows.is_some() {
        patch.rows = command.rows;
    }
    if !command.columns.is_empty() {
        patch.columns = Some(command.columns);
    }
    if !command.tags.is_empty() {
        patch.tags = Some(command.tags);
    }
    if patch.is_empty() {
        return Err(CliError::new("update requires at least one field"));
    }
    Ok(patch)
}

/// Reads and parses a JSON patch file.
fn read_patch(path: &Path) -> CliResult<RecordPatch> {
    let bytes = read_bytes_with_limit(path, MAX_PATCH_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} exceeds size limit ({size} > {limit} bytes)",
            path.display()
        )),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid patch in {}: {err}", path.display())))
}

/// Bounded read failures.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Maps an engine failure to a CLI error.
fn engine_error(err: dataset_catalog_core::EngineError) -> CliError {
    CliError::new(err.to_string())
}

/// Writes pretty JSON followed by a newline to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| CliError::new(format!("failed to encode output: {err}")))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout
        .write_all(&bytes)
        .and_then(|()| stdout.flush())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
