// src/main.rs
use clap::Parser;
use colored::Colorize;
use ct_logsync::cli::Cli;
use ct_logsync::config::{Config, StatelessLogPolicy};
use ct_logsync::ct_log::{LogListFetcher, RootHarvester};
use ct_logsync::pipeline;
use ct_logsync::progress::ProgressIndicator;
use ct_logsync::stats::HarvestStats;
use is_terminal::IsTerminal;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    cli.validate()?;

    // Load config file
    let mut config = Config::load_or_default(Path::new(&cli.config))?;

    // Apply CLI overrides
    if let Some(max_concurrent) = cli.max_concurrent {
        config.harvest.max_concurrent = max_concurrent;
    }
    if cli.include_stateless_logs {
        config.harvest.stateless_logs = StatelessLogPolicy::Include;
    }

    // Initialize logging
    let log_level = cli.log_level().unwrap_or(config.logging.level.as_str());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    tracing::info!("Starting ct-logsync...");

    if cli.fetch {
        let fetcher = LogListFetcher::new(config.sources.fetch_timeout())?;
        fetcher.refresh_cache(&config.sources).await?;
    } else {
        tracing::debug!("Using cached log lists in {:?}", config.sources.data_dir);
    }

    // Any input fault aborts here, before outputs are touched
    let merged = pipeline::load_and_reconcile(&config.sources).await?;
    pipeline::write_merged(&config.output.merged_output, &merged).await?;

    if cli.no_harvest {
        tracing::info!("Root harvesting disabled");
        return Ok(());
    }

    let now = cli.now.unwrap_or_else(chrono::Utc::now);

    // Ctrl-C stops new log fetches; in-flight ones complete
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight logs...");
            let _ = shutdown_tx.send(true);
        }
    });

    let progress =
        ProgressIndicator::new(cli.should_show_progress() && std::io::stderr().is_terminal());
    let harvester = RootHarvester::new(config.harvest.clone())
        .await?
        .with_progress(progress);

    let report = harvester.run(merged, now, shutdown_rx).await;
    let snapshot = harvester.stats().snapshot();

    println!("\n{}", "Root harvest summary".bold());
    println!("  Logs harvested:   {}", report.harvested.len().to_string().green());
    println!("  Logs failed:      {}", report.failed.len().to_string().yellow());
    println!("  Logs ineligible:  {}", snapshot.ineligible);
    if !report.not_attempted.is_empty() {
        println!("  Not attempted:    {}", report.not_attempted.len().to_string().red());
    }
    println!(
        "  Roots seen:       {} ({} new)",
        snapshot.roots_seen,
        snapshot.new_roots.to_string().green()
    );
    println!("  Elapsed:          {}", HarvestStats::format_elapsed(snapshot.elapsed_secs));

    for (url, error) in &report.failed {
        println!("  {} {}: {}", "!".yellow(), url, error);
    }

    Ok(())
}
