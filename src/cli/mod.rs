//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the trackapi binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::batch::{BatchOptions, InputFormat, MutationTarget, OperationKind};
use crate::config::{
    ClientConfig, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, ENV_MAX_RETRIES,
    ENV_TIMEOUT, ENV_TOKEN, ENV_URL,
};
use crate::error::{Result, TrackerError};
use crate::fields::{is_paging_param, QueryParams};
use crate::pagination::{Cursor, PageState};

/// Default cap on listed results.
pub const DEFAULT_MAX_RESULTS: u64 = 1000;

/// Issue tracker command-line interface.
#[derive(Parser, Debug)]
#[command(name = "trackapi", about = "Issue tracker API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Tracker API base URL.
    #[arg(long, global = true, env = ENV_URL)]
    pub api_url: Option<String>,

    /// API token.
    #[arg(long, global = true, env = ENV_TOKEN, hide_env_values = true)]
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = ENV_TIMEOUT, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Retries for idempotent calls on rate limits and server errors.
    #[arg(long, global = true, env = ENV_MAX_RETRIES, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Client settings from flags, which clap already layered over `TRACKER_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ConfigMissing`] when no token was given.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                TrackerError::ConfigMissing(format!("{ENV_TOKEN} not set and no --token given"))
            })?;
        let base_url = self.api_url.as_deref().unwrap_or(DEFAULT_API_URL);

        Ok(ClientConfig::new(token, base_url)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_retries(self.max_retries))
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List resources of an endpoint, following pages automatically.
    List(ListArgs),

    /// Apply create or update operations from a CSV, JSON or YAML file.
    Batch(BatchArgs),
}

/// Arguments of `trackapi list`.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Endpoint path, e.g. `issues` or `projects/CORE/issues`.
    pub endpoint: String,

    /// Fields to fetch and display (repeatable, comma-separated allowed).
    #[arg(long = "fields", short = 'f', value_name = "FIELD")]
    pub fields: Vec<String>,

    /// Fields to leave out.
    #[arg(long, value_name = "FIELD")]
    pub exclude: Vec<String>,

    /// Filter as KEY=VALUE (repeatable).
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Stop after this many results.
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: u64,

    /// Results per request (defaults to the endpoint's page size).
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Show one page at a time and ask before fetching the next.
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Resume a cursor-paged listing.
    #[arg(long, conflicts_with = "skip")]
    pub cursor: Option<String>,

    /// Resume an offset-paged listing.
    #[arg(long)]
    pub skip: Option<u32>,
}

impl ListArgs {
    /// Filters as query parameters.
    pub fn base_params(&self) -> QueryParams {
        self.filters.clone()
    }

    /// The resume point given on the command line.
    pub fn start(&self) -> Option<PageState> {
        match (&self.cursor, self.skip) {
            (Some(token), _) => Some(PageState::Cursor(Cursor::from_token(token.clone()))),
            (None, Some(skip)) => Some(PageState::Offset { skip }),
            (None, None) => None,
        }
    }
}

/// Batch operation selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOperation {
    /// Create new resources inside containers.
    Create,
    /// Update existing resources by id.
    Update,
}

impl From<BatchOperation> for OperationKind {
    fn from(op: BatchOperation) -> Self {
        match op {
            BatchOperation::Create => OperationKind::Create,
            BatchOperation::Update => OperationKind::Update,
        }
    }
}

/// Arguments of `trackapi batch`.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Operation applied to every record.
    pub operation: BatchOperation,

    /// Input file (.csv, .json, .yaml or .yml).
    pub file: PathBuf,

    /// Collection the records belong to.
    #[arg(long, default_value = "issues")]
    pub resource: String,

    /// Collection holding the containers new records are created in.
    #[arg(long, default_value = "projects")]
    pub container_resource: String,

    /// Validate and preview without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Keep going after a failed record.
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub continue_on_error: bool,

    /// On the first failure, delete everything this run created (implies stopping).
    #[arg(long)]
    pub rollback_on_error: bool,

    /// Write records that were not applied to this file.
    #[arg(long, value_name = "PATH")]
    pub failed_output: Option<PathBuf>,

    /// Records in flight at once (ignored with --rollback-on-error).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,
}

impl BatchArgs {
    pub fn target(&self) -> MutationTarget {
        MutationTarget::new(self.resource.clone(), self.container_resource.clone())
    }

    /// Engine options; `--rollback-on-error` turns off `--continue-on-error`.
    ///
    /// Fails when `--failed-output` names a file `batch` could not read back.
    pub fn options(&self) -> Result<BatchOptions> {
        let mut options = BatchOptions::default()
            .dry_run(self.dry_run)
            .continue_on_error(self.continue_on_error && !self.rollback_on_error)
            .rollback_on_error(self.rollback_on_error)
            .concurrency(usize::from(self.concurrency));
        if let Some(path) = &self.failed_output {
            InputFormat::from_path(path)?;
            options.failed_output = Some(path.clone());
        }
        Ok(options)
    }
}

/// Parse a `KEY=VALUE` filter.
pub fn parse_filter(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, _)) if is_paging_param(key.trim()) => Err(TrackerError::InvalidArgument(
            format!(
                "filter '{raw}' sets a paging key; use --page-size, --cursor or --skip instead"
            ),
        )),
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(TrackerError::InvalidArgument(format!(
            "filter '{raw}' must look like KEY=VALUE"
        ))),
    }
}
