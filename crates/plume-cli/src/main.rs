use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use plume_core::{
    AppConfig, ExtractedRecord, LoggingConfig, VerificationRequest, VerificationResult,
    VerificationStatus,
};
use plume_resolve::{
    CanonicalMatcher, CatalogClient, DiskCache, JsonCatalogSource, SnapshotCache,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "plume",
    about = "Resolve and verify book mentions against canonical catalogs",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting PLUME_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify one author, book or publisher against the external catalog.
    Verify {
        #[command(subcommand)]
        target: VerifyTarget,
    },

    /// Verify a JSON array of requests; results keep the input order.
    VerifyBatch { file: PathBuf },

    /// Match extracted records against a catalog snapshot.
    Match { records: PathBuf, catalog: PathBuf },

    /// Lookup cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum VerifyTarget {
    /// Verify an author name.
    Author { name: String },
    /// Verify a book title, optionally with its author.
    Book {
        title: String,
        #[arg(long)]
        author: Option<String>,
    },
    /// Verify a publisher name.
    Publisher { name: String },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove expired and unreadable entries.
    Sweep,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration.
    Show,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("PLUME_JSON").as_deref() == Ok("1");

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    init_logging(&config.logging);
    tracing::debug!(cache_dir = %config.cache_dir().display(), "config loaded");

    match cli.command {
        Commands::Verify { target } => {
            let request = match target {
                VerifyTarget::Author { name } => VerificationRequest::Author { name },
                VerifyTarget::Book { title, author } => {
                    VerificationRequest::Book { title, author }
                }
                VerifyTarget::Publisher { name } => VerificationRequest::Publisher { name },
            };
            let client = CatalogClient::from_config(&config)?;
            let result = match client.verify(&request).await {
                Ok(result) => result,
                Err(e) if json_output => {
                    let kind = if e.is_transient() { "unreachable" } else { "failed" };
                    print_json(&serde_json::json!({
                        "status": "error",
                        "error": kind,
                        "message": e.to_string(),
                        "meta": { "duration_ms": start.elapsed().as_millis() }
                    }))?;
                    std::process::exit(3);
                }
                Err(e) => {
                    eprintln!("Verification failed: {e}");
                    if e.is_transient() {
                        eprintln!("The catalog could not be reached; retry later.");
                    }
                    std::process::exit(3);
                }
            };

            if json_output {
                print_ok(&result, start)?;
            } else {
                print_verification(&result);
            }
        }

        Commands::VerifyBatch { file } => {
            let requests: Vec<VerificationRequest> = read_json(&file)?;
            let client = CatalogClient::from_config(&config)?;
            let results = client.verify_batch(&requests).await;
            let failed = results
                .iter()
                .filter(|r| r.status == VerificationStatus::Error)
                .count();

            if json_output {
                print_ok(&results, start)?;
            } else {
                for result in &results {
                    print_verification(result);
                }
                println!("\n{} checked, {failed} failed", results.len());
            }
            if failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Match { records, catalog } => {
            let records: Vec<ExtractedRecord> = read_json(&records)?;
            let snapshots = SnapshotCache::new(
                JsonCatalogSource::new(&catalog),
                config.matching.snapshot_ttl(),
            );
            let snapshot = snapshots
                .snapshot()
                .await
                .with_context(|| format!("loading catalog {}", catalog.display()))?;
            let matcher = CanonicalMatcher::from_config(&config.matching);
            let results = matcher.resolve(&records, &snapshot);

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": results, "total": results.len(),
                              "matched": results.iter().filter(|r| r.is_matched()).count() },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                for result in &results {
                    match (&result.canonical_book_id, result.match_tier) {
                        (Some(id), Some(tier)) => println!(
                            "{source:<12}  {tier:<16}  {id:<12}  {title}",
                            source = result.source_record_id,
                            tier = tier.to_string(),
                            title = result.display_title,
                        ),
                        _ => println!(
                            "{source:<12}  {:<16}  {:<12}  {title}",
                            "unmatched",
                            "-",
                            source = result.source_record_id,
                            title = result.original_title,
                        ),
                    }
                }
            }
        }

        Commands::Cache { action } => match action {
            CacheAction::Sweep => {
                let cache = DiskCache::new(config.cache_dir(), config.cache.ttl());
                let removed = cache.sweep().await?;
                if json_output {
                    print_ok(
                        &serde_json::json!({ "removed": removed, "dir": cache.dir() }),
                        start,
                    )?;
                } else {
                    println!(
                        "Removed {removed} cache entries from {}",
                        cache.dir().display()
                    );
                }
            }
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_ok(&config, start)?;
                } else {
                    let path = cli.config.unwrap_or_else(AppConfig::config_path);
                    println!("# {}", path.display());
                    println!("{}", config.to_toml()?);
                }
            }
        },
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` overrides the
/// configured level.
fn init_logging(config: &LoggingConfig) {
    let default = format!(
        "plume={0},plume_resolve={0},plume_core={0}",
        config.level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_ok<T: Serialize>(data: &T, start: Instant) -> Result<()> {
    print_json(&serde_json::json!({
        "status": "ok",
        "data": data,
        "meta": { "duration_ms": start.elapsed().as_millis() }
    }))
}

fn print_verification(result: &VerificationResult) {
    let subject = result
        .original_title
        .as_deref()
        .or(result.original_author.as_deref())
        .unwrap_or("-");
    let suggestion = match (&result.suggested_title, &result.suggested_author) {
        (Some(title), Some(author)) => format!("{title} / {author}"),
        (Some(title), None) => title.clone(),
        (None, Some(author)) => author.clone(),
        (None, None) => result.enriched_publisher.clone().unwrap_or_default(),
    };

    println!(
        "{status:<10}  {score:.2}  {subject} → {suggestion}",
        status = result.status.to_string(),
        score = result.confidence_score,
    );
    if let Some(publisher) = &result.enriched_publisher {
        println!("            publisher: {publisher}");
    }
    if let Some(url) = &result.canonical_url {
        println!("            {url}");
    }
    if let Some(message) = &result.error_message {
        println!("            error: {message}");
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))
}
