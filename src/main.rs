//! Institution crawler main entry point
//!
//! This is the command-line interface for the institution discovery crawler.

use anyhow::{bail, Context};
use clap::Parser;
use institution_crawler::config::{load_config_with_hash, validate, Config};
use institution_crawler::crawler::crawl;
use institution_crawler::output::{
    load_snapshot, output_path, print_report, print_summary, summarize,
};
use institution_crawler::query::{exceeds_query_length, QueryPlan};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Institution discovery crawler
///
/// Enumerates a remote institution-search endpoint with a plan of short
/// queries, keeps the records matching the configured classification rules,
/// and writes the unique results to a sorted JSON file.
#[derive(Parser, Debug)]
#[command(name = "institution-crawler")]
#[command(version)]
#[command(about = "A deduplicating institution-discovery crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the target country code from the config
    #[arg(long, value_name = "CC")]
    country: Option<String>,

    /// Override the worker pool width from the config
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Validate config and show the query plan without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Summarize the existing output file and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("institution_crawler=info,warn"),
            1 => EnvFilter::new("institution_crawler=debug,info"),
            2 => EnvFilter::new("institution_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(country) = &cli.country {
        config.endpoint.country = country.trim().to_ascii_uppercase();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    validate(config).context("invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: shows the configuration and query plan
fn handle_dry_run(config: &Config) {
    println!("=== Institution Crawler Dry Run ===\n");

    println!("Endpoint:");
    println!("  URL: {}", config.endpoint.url);
    println!("  Country: {}", config.endpoint.country);
    println!("  Locale: {}", config.endpoint.locale);

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Max offset: {}", config.crawler.max_offset);
    println!(
        "  Max consecutive empty pages: {}",
        config.crawler.max_consecutive_empty
    );
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Checkpoint interval: {}s",
        config.crawler.checkpoint_interval_secs
    );

    println!("\nUser Agents ({}):", config.user_agent.pool().len());
    for agent in config.user_agent.pool() {
        println!("  - {}", agent);
    }

    println!("\nRules:");
    println!("  Allowed types: {}", config.rules.allowed_types.join(", "));
    println!("  Excluded types: {}", config.rules.excluded_types.join(", "));

    let max_len = config.crawler.max_query_length;
    let plan = QueryPlan::generate(&config.queries, config.country_keywords());
    println!("\nQuery Plan ({} queries):", plan.len());
    for query in plan.queries() {
        let note = if exceeds_query_length(query, max_len) {
            " (skipped: too long)"
        } else {
            ""
        };
        println!("  - {:?}{}", query, note);
    }

    println!(
        "\nOutput: {}",
        output_path(&config.output, &config.endpoint.country).display()
    );
    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would run {} queries",
        plan.len() - plan.count_over_length(max_len)
    );
}

/// Handles the --stats mode: summarizes the existing output file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = output_path(&config.output, &config.endpoint.country);
    println!("Snapshot: {}\n", path.display());

    let records =
        load_snapshot(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let summary = summarize(&records);
    print_summary(&summary, &records[..records.len().min(10)]);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl of {} for country {}",
        config.endpoint.url,
        config.endpoint.country
    );

    let report = crawl(config).await.context("crawl failed to start")?;
    print_report(&report);

    if let Some(e) = &report.final_write_error {
        tracing::error!("Results could not be saved: {}", e);
        bail!(
            "failed to write {}: {}",
            report.output_path.display(),
            e
        );
    }

    Ok(())
}
