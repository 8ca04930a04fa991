//! CLI entry point for the harvester tool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{
    CheckpointState, CredentialPool, CustomSearchClient, HarvestConfig, ImageClient, Orchestrator,
    RunOutcome, RunReport, config,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Harvester starting");

    // Configuration failures exit before any checkpoint state is touched.
    let credentials = config::load_credentials().context("configuration error")?;
    info!(count = credentials.len(), "loaded credential pair(s)");
    let mut pool = CredentialPool::new(credentials).context("configuration error")?;

    let queries = config::read_queries(&args.queries).context("failed to load queries")?;
    info!(count = queries.len(), file = %args.queries.display(), "loaded queries");

    let (use_date_filters, use_size_filters) = args.filter_axes();
    let harvest_config = HarvestConfig {
        queries,
        queries_file: args.queries.clone(),
        target_count: usize::from(args.count),
        output_dir: args.output.clone(),
        prefix: args.prefix.clone(),
        use_date_filters,
        use_size_filters,
        progress_file: args.progress_file.clone(),
    };

    let mut checkpoint = CheckpointState::new(&harvest_config.progress_file);
    if args.fresh {
        checkpoint
            .discard()
            .context("failed to remove checkpoint for fresh start")?;
        info!("starting fresh (--fresh)");
    } else if checkpoint.load() {
        info!(
            last_run = ?checkpoint.updated_at(),
            completed = checkpoint.completed_count(),
            total = checkpoint.total_combinations(),
            images_saved = checkpoint.stats().images_saved,
            hashes_loaded = checkpoint.ledger().seen_count(),
            "resuming from previous session"
        );
    }

    // Cooperative cancellation: first ctrl-c sets the flag, the orchestrator
    // saves and exits cleanly at the next unit/item boundary.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing current item and saving");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let search_client = CustomSearchClient::new();
    let image_client = ImageClient::new();
    let mut orchestrator = Orchestrator::new(&harvest_config, &search_client, &image_client)
        .context("failed to prepare output directory")?;
    if args.quiet {
        orchestrator = orchestrator.without_progress_bar();
    }

    let report = orchestrator
        .run(&mut checkpoint, &mut pool, &cancel)
        .await
        .context("failed to persist checkpoint")?;

    print_report(&report, &checkpoint, &harvest_config);

    Ok(())
}

fn print_report(report: &RunReport, checkpoint: &CheckpointState, config: &HarvestConfig) {
    match report.outcome {
        RunOutcome::Completed => {
            let remaining = report.remaining_units();
            if remaining > 0 {
                warn!(
                    remaining,
                    "pass finished with units left to retry, run again to complete"
                );
            } else {
                info!("run completed");
            }
        }
        RunOutcome::PausedExhausted => {
            info!("run paused: all credentials exhausted, run again later to continue");
        }
        RunOutcome::Interrupted => info!("run interrupted, progress saved"),
    }

    info!(
        completed = report.completed_units,
        total = report.total_units,
        images_saved = report.stats.images_saved,
        duplicates_skipped = report.stats.duplicates_skipped,
        errors = report.stats.errors,
        no_results = report.no_result_units,
        credential = %format!(
            "{}/{} ({} exhausted)",
            report.credential_ordinal, report.credentials_total, report.credentials_exhausted
        ),
        output = %config.output_dir.display(),
        "summary"
    );

    for entry in checkpoint.no_results() {
        info!(
            query = %entry.query,
            filters = %entry.filters,
            "no results for combination"
        );
    }
}
