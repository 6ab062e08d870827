//! Social-Sync main entry point
//!
//! This is the command-line interface for the Social-Sync content mirror.

use anyhow::Context;
use clap::Parser;
use social_sync::config::{load_config_with_hash, Config, Credentials};
use social_sync::crawler::sync_once;
use social_sync::output::{load_status, print_check_report, print_status, run_checks};
use social_sync::storage::open_existing_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Social-Sync: incremental content mirror
///
/// Social-Sync crawls posts, comments and replies newer than the last
/// successful sync, stores them in SQLite and upserts their normalized
/// text embeddings into a vector index. Each invocation runs one pass.
#[derive(Parser, Debug)]
#[command(name = "social-sync")]
#[command(version = "1.0.0")]
#[command(about = "Incremental content mirror into SQLite and a vector index", long_about = None)]
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

    /// Validate config and credentials and show what would run
    #[arg(long, conflicts_with_all = ["status", "check"])]
    dry_run: bool,

    /// Show the watermark, stored rows and last run, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "check"])]
    status: bool,

    /// Test connectivity to the content API, database and vector index
    #[arg(long, conflicts_with_all = ["dry_run", "status"])]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Secrets may come from a local .env file
    dotenvy::dotenv().ok();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.status {
        return handle_status(&config);
    }

    // Missing secrets are fatal in every remaining mode
    let credentials = Credentials::from_env(&config)?;

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.check {
        handle_check(&config, &credentials).await
    } else {
        handle_sync(&config, &credentials, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("social_sync=info,warn"),
            1 => EnvFilter::new("social_sync=debug,info"),
            2 => EnvFilter::new("social_sync=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved settings and where the next sync starts
fn handle_dry_run(config: &Config) {
    println!("=== Social-Sync Dry Run ===\n");

    println!("Content API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Page size: {}", config.api.page_size);
    println!("  Rate limit delay: {}ms", config.api.rate_limit_delay_ms);
    println!("  Max retries: {}", config.api.max_retries);

    println!("\nEmbedding:");
    println!("  Endpoint: {}", config.embedding.endpoint);
    println!("  Model: {}", config.embedding.model);
    println!("  Dimensions: {}", config.embedding.dims);

    println!("\nVector Index:");
    println!("  Name: {}", config.vector_index.index_name);
    println!(
        "  Location: {} {}",
        config.vector_index.cloud, config.vector_index.region
    );
    println!("  Upsert batch size: {}", config.vector_index.upsert_batch_size);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Credentials found ({}, {}, {})",
        config.api.access_token_env,
        config.embedding.api_key_env,
        config.vector_index.api_key_env
    );

    let status = open_existing_storage(Path::new(&config.storage.database_path))
        .and_then(|storage| storage.map(|s| load_status(&s)).transpose());
    match status {
        Ok(None) => println!("✓ Would create the database and run a first full sync"),
        Ok(Some(status)) => match status.watermark {
            Some(w) => println!("✓ Would sync everything newer than {}", w.to_rfc3339()),
            None => println!("✓ Would run a first full sync"),
        },
        Err(e) => println!("✗ Database not readable: {}", e),
    }
}

/// Handles the --status mode: shows what has been synced so far
fn handle_status(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let Some(storage) = open_existing_storage(Path::new(&config.storage.database_path))
        .context("opening database")?
    else {
        println!("No database yet: nothing has been synced.");
        return Ok(());
    };
    let status = load_status(&storage)?;
    print_status(&status);

    Ok(())
}

/// Handles the --check mode: probes each collaborator
async fn handle_check(config: &Config, credentials: &Credentials) -> anyhow::Result<()> {
    let report = run_checks(config, credentials).await;
    print_check_report(&report);

    if report.all_ok() {
        Ok(())
    } else {
        anyhow::bail!("connectivity check failed")
    }
}

/// Handles the main sync operation
async fn handle_sync(
    config: &Config,
    credentials: &Credentials,
    config_hash: &str,
) -> anyhow::Result<()> {
    match sync_once(config, credentials, config_hash).await {
        Ok(report) => {
            if !report.crawl.failed_posts.is_empty() {
                tracing::warn!(
                    "{} posts failed and were skipped this run",
                    report.crawl.failed_posts.len()
                );
            }
            tracing::info!("Sync completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sync failed: {}", e);
            Err(e.into())
        }
    }
}
