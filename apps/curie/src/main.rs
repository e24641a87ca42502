//! curie - fetch and cache Curie product assets
//!
//! This is the command line front end over the asset cache. It wires the
//! configuration, the signed URL exchange and the cache together, turns
//! library events into log records and status lines, and renders results.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod retry;
mod setup;

use crate::cli::{Cli, Commands};
use crate::display::{FetchFailure, FetchReport, OperationResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use crate::retry::{resolve_with_retry, RetryPolicy};
use clap::Parser;
use curie_config::Config;
use curie_events::{EventEmitter, EventReceiver, EventSender, FailureContext};
use curie_store::AssetCache;
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting curie v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global);

    let (event_sender, event_receiver) = curie_events::channel();

    let cache = setup::build_cache(
        &config,
        cli.command.needs_network(),
        event_sender.clone(),
    )?;

    let renderer = OutputRenderer::new(cli.global.json);
    let colors_enabled = !cli.global.json && console::Term::stderr().features().colors_supported();
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug);

    let result = execute_command_with_events(
        cli.command,
        &cache,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;

    if let OperationResult::Fetched(report) = &result {
        if !report.failures.is_empty() {
            return Err(CliError::Incomplete {
                failed: report.failures.len(),
                total: report.total(),
            });
        }
    }

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    cache: &AssetCache,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, cache, event_sender));

    // Handle events concurrently with command execution
    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    cache: &AssetCache,
    events: EventSender,
) -> Result<OperationResult, CliError> {
    match command {
        Commands::Fetch { keys, retries } => {
            let report = fetch(cache, &keys, &RetryPolicy::with_retries(retries), &events).await;
            Ok(OperationResult::Fetched(report))
        }

        Commands::Path { key } => match cache.lookup(&key).await? {
            Some(product) => Ok(OperationResult::Path(product)),
            None => Err(CliError::NotCached(key.to_string())),
        },

        Commands::List => {
            let products = cache.list().await?;
            Ok(OperationResult::List { products })
        }

        Commands::Remove { key } => {
            let removed = cache.remove(&key).await?;
            Ok(OperationResult::Removed {
                key: key.to_string(),
                removed,
            })
        }

        Commands::Clean => {
            let removed = cache.clean_partials().await?;
            Ok(OperationResult::Cleaned { removed })
        }
    }
}

/// Resolve every key concurrently, collecting successes and failures
async fn fetch(
    cache: &AssetCache,
    keys: &[curie_types::ProductKey],
    policy: &RetryPolicy,
    events: &EventSender,
) -> FetchReport {
    events.emit_operation_started(format!("fetch {} product(s)", keys.len()));

    let outcomes = futures::future::join_all(
        keys.iter()
            .map(|key| async move { (key, resolve_with_retry(cache, key, policy, events).await) }),
    )
    .await;

    let mut report = FetchReport::default();
    for (key, outcome) in outcomes {
        match outcome {
            Ok(product) => report.products.push(product),
            Err(err) => report.failures.push(FetchFailure {
                key: key.to_string(),
                failure: FailureContext::from_error(&err),
            }),
        }
    }

    events.emit_operation_completed("fetch", report.failures.is_empty());
    report
}

/// Initialize tracing/logging
///
/// Logs always go to stderr; stdout carries only command results.
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    // Check if debug logging is enabled
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    let default_filter = if debug_enabled {
        "info,curie=debug,curie_store=debug,curie_net=debug,curie_config=debug"
    } else {
        "warn,curie=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        if debug_enabled {
            // JSON mode: structured records only, never mixed with the result on stdout
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        } else {
            // Fallback: disable all logging in JSON mode
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter("off")
                .init();
        }
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(debug_enabled)
            .with_env_filter(filter)
            .init();
    }
}

/// Apply CLI configuration overrides
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(dir) = &global.cache_dir {
        config.cache.dir = Some(dir.clone());
    }
}
