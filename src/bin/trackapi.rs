//! Issue tracker CLI binary.
//!
//! A command-line interface for listing tracker resources and applying bulk
//! batch operations.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use trackapi::cli::{BatchArgs, Cli, Command, ListArgs};
use trackapi::output::{record_columns, records_table, PrettyPrint};
use trackapi::{
    optimize_query, selected_fields, BatchAborted, BatchEngine, BatchInput, BatchRun,
    BatchSummary, ListRequest, OperationKind, PaginationConfig, ResourceKind, ResultStreamer,
    Termination, TrackerClient, TrackerError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let client = match cli.client_config().and_then(TrackerClient::with_config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set TRACKER_API_TOKEN environment variable or pass --token");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(hint) = hint_for(&e) {
                eprintln!("Hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays clean for tables and JSON.
fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "trackapi=debug,info",
        _ => "trackapi=trace,debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn hint_for(error: &TrackerError) -> Option<&'static str> {
    match error {
        TrackerError::PermissionDenied { .. } => {
            Some("Check that the token is valid and has access to this resource")
        }
        TrackerError::InvalidCursor { .. } => Some("Run the listing again without --cursor"),
        TrackerError::UnsupportedFormat(_) => Some("Use a .csv, .json, .yaml or .yml file"),
        TrackerError::RateLimited { .. } => Some("Wait a moment, or lower --concurrency"),
        _ => None,
    }
}

async fn run(client: &TrackerClient, cli: Cli) -> trackapi::Result<ExitCode> {
    match cli.command {
        Command::List(args) if args.interactive => {
            handle_list_interactive(client, args, cli.json).await
        }
        Command::List(args) => handle_list(client, args, cli.json).await,
        Command::Batch(args) => handle_batch(client, args, cli.json).await,
    }
}

/// Query parameters and display columns for a listing.
fn prepare_list(args: &ListArgs) -> (ListRequest, Vec<String>) {
    let kind = ResourceKind::from_endpoint(&args.endpoint);
    let params = optimize_query(&args.base_params(), &args.fields, &args.exclude, kind);
    let columns = selected_fields(&params);

    let mut request = ListRequest::new(args.endpoint.clone())
        .with_params(params)
        .with_max_results(args.max_results);
    if let Some(page_size) = args.page_size {
        request = request.with_page_size(page_size);
    }
    if let Some(start) = args.start() {
        request = request.starting_at(start);
    }
    (request, columns)
}

async fn handle_list(
    client: &TrackerClient,
    args: ListArgs,
    json: bool,
) -> trackapi::Result<ExitCode> {
    let config = PaginationConfig::builtin();
    let (mut request, columns) = prepare_list(&args);

    let mut listing = ResultStreamer::new(client, &config, request.clone())?
        .drain()
        .await;

    let stale_cursor = matches!(
        listing.termination,
        Termination::Failed(TrackerError::InvalidCursor { .. })
    );
    if stale_cursor && listing.items.is_empty() && request.start.is_some() {
        eprintln!("Warning: the cursor is no longer valid; listing from the first page");
        request.start = None;
        listing = ResultStreamer::new(client, &config, request)?.drain().await;
    }

    output_items(&listing.items, &columns, json)?;
    if let Some(note) = listing.note() {
        eprintln!("\n{note}");
    }

    Ok(match listing.termination {
        Termination::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

async fn handle_list_interactive(
    client: &TrackerClient,
    args: ListArgs,
    json: bool,
) -> trackapi::Result<ExitCode> {
    let config = PaginationConfig::builtin();
    let (request, columns) = prepare_list(&args);
    let resumed = request.start.is_some();

    let mut streamer = ResultStreamer::new(client, &config, request)?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut restarted = false;
    let mut page_number = 0u32;

    loop {
        let page = match streamer.next_page().await {
            Ok(Some(page)) => page,
            Ok(None) => {
                eprintln!("(end of results)");
                return Ok(ExitCode::SUCCESS);
            }
            Err(TrackerError::InvalidCursor { .. })
                if resumed && !restarted && streamer.yielded() == 0 =>
            {
                eprintln!("Warning: the cursor is no longer valid; listing from the first page");
                streamer.restart();
                restarted = true;
                continue;
            }
            Err(e) => return Err(e),
        };

        page_number += 1;
        output_items(&page.items, &columns, json)?;

        let total = page
            .total
            .map(|t| format!(" of {t}"))
            .unwrap_or_default();
        eprintln!(
            "-- page {page_number}, {} results{total} so far --",
            streamer.yielded()
        );

        if streamer.is_finished() {
            if let Some(next) = &page.next {
                eprintln!("Reached --max-results; continue with {}", next.resume_hint());
            }
            return Ok(ExitCode::SUCCESS);
        }

        eprint!("Enter for the next page, q to quit: ");
        std::io::stderr().flush()?;
        let answer = stdin.next_line().await?;
        let quit = answer.map_or(true, |line| line.trim().eq_ignore_ascii_case("q"));
        if quit {
            if let Some(next) = &page.next {
                eprintln!("Resume with {}", next.resume_hint());
            }
            return Ok(ExitCode::SUCCESS);
        }
    }
}

fn output_items(items: &[Value], columns: &[String], json: bool) -> trackapi::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else if items.is_empty() {
        println!("No results.");
    } else {
        let columns = record_columns(items, columns);
        println!("{}", records_table(items, &columns));
    }
    Ok(())
}

async fn handle_batch(
    client: &TrackerClient,
    args: BatchArgs,
    json: bool,
) -> trackapi::Result<ExitCode> {
    let operation = OperationKind::from(args.operation);
    let options = args.options()?;
    let input = BatchInput::load(&args.file, operation)?;
    tracing::info!(file = %args.file.display(), records = input.len(), "Loaded batch");

    let engine = BatchEngine::new(client, args.target(), options);
    let (run, aborted) = match engine.run(&input).await {
        Ok(run) => (run, None),
        Err(BatchAborted { line, source, run }) => (*run, Some((line, source))),
    };

    output_run(&run, json)?;

    if let Some((line, source)) = aborted {
        eprintln!("\nError: batch stopped at line {line}: {source}");
        if let Some(hint) = hint_for(&source) {
            eprintln!("Hint: {hint}");
        }
        return Ok(ExitCode::FAILURE);
    }

    Ok(if run.summary().is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[derive(Serialize)]
struct BatchReport<'a> {
    summary: BatchSummary,
    #[serde(flatten)]
    run: &'a BatchRun,
}

fn output_run(run: &BatchRun, json: bool) -> trackapi::Result<()> {
    if json {
        let report = BatchReport {
            summary: run.summary(),
            run,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", run.pretty_print());
    }
    Ok(())
}
