//! weather-fx-pipeline binary entrypoint.
//! Each stage can be invoked on its own (`fetch`, `parse`, `persist`) or the
//! whole pipeline can run once (`run`) or on a schedule (`schedule`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weather_fx_pipeline::config::PipelineConfig;
use weather_fx_pipeline::handoff::{persist_published, HandoffStore, PARSE_STAGE_KEY};
use weather_fx_pipeline::ingest::content_store::ContentStore;
use weather_fx_pipeline::ingest::http::HttpSource;
use weather_fx_pipeline::orchestrator::{spawn_scheduler, Pipeline};
use weather_fx_pipeline::persist::postgres::{run_migrations, PgObservationSink};
use weather_fx_pipeline::{fetch_documents, parse_documents};

#[derive(Parser, Debug)]
#[command(author, version, about = "Weather + USD/CNY feed pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download every configured feed into the content store (single attempt)
    Fetch,
    /// Extract values from the stored feeds and publish them for `persist`
    Parse,
    /// Write the record published by `parse` to the database (single attempt)
    Persist,
    /// Run fetch → parse → persist once, with retries
    Run,
    /// Run the pipeline on the configured interval until interrupted
    Schedule,
    /// Create the observation tables
    Migrate,
}

/// `RUST_LOG` controls verbosity (default `info`); `LOG_FORMAT=json` switches
/// to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = PipelineConfig::load_default()?;

    if let Some(addr) = cfg.metrics_addr {
        weather_fx_pipeline::metrics::install_exporter(addr)?;
    }

    let store = ContentStore::new(&cfg.content_dir);
    let handoff = HandoffStore::new(&cfg.handoff_dir);

    // Single-stage commands make one attempt; retrying is up to whoever calls them.
    match cli.command {
        Command::Fetch => {
            let source = HttpSource::new(cfg.fetch_timeout(), &cfg.user_agent)?;
            let fetched = fetch_documents(&source, &store, &cfg.sources).await?;
            tracing::info!(documents = fetched.len(), "fetch done");
        }
        Command::Parse => {
            let record = parse_documents(&store, &cfg.document_names()).await;
            handoff.put(PARSE_STAGE_KEY, &record).await?;
            tracing::info!(dir = %handoff.dir().display(), "record published");
        }
        Command::Persist => {
            let sink = PgObservationSink::new(cfg.resolve_database_url()?);
            let outcome = persist_published(&handoff, &sink).await?;
            tracing::info!(rows = outcome.total(), "persist done");
        }
        Command::Run => {
            let pipeline = Pipeline::from_config(&cfg)?;
            pipeline.run_once().await?;
        }
        Command::Schedule => {
            let pipeline = Pipeline::from_config(&cfg)?;
            let handle = spawn_scheduler(pipeline, cfg.interval());
            tracing::info!(interval_secs = cfg.interval_secs, "scheduler started");
            tokio::select! {
                res = handle => res.context("scheduler task ended")?,
                _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
            }
        }
        Command::Migrate => {
            run_migrations(&cfg.resolve_database_url()?).await?;
            tracing::info!("database migrations applied");
        }
    }

    Ok(())
}
