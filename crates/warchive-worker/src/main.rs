//! Slideshow worker binary.
//!
//! Runs the pipeline once over the trailing window and prints the run
//! summary as JSON, or repeats on `WORKER_INTERVAL_SECS` until interrupted.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use warchive_db::{connect, ensure_schema, DbConfig, PgPhotoRepository, PgVideoRepository};
use warchive_media::{FfmpegRunner, FfmpegSlideshow};
use warchive_models::{RunSummary, SelectionWindow, SlideshowSpec};
use warchive_storage::S3Client;
use warchive_worker::metrics::install_exporter;
use warchive_worker::{Pipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialise logging: {:#}", e);
        std::process::exit(1);
    }

    info!("Starting warchive-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Err(e) = run(config).await {
        error!("Worker error: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

/// Colored output for dev, JSON for production.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    for directive in [
        "warchive_worker=info",
        "warchive_db=info",
        "warchive_media=info",
        "warchive_storage=info",
    ] {
        env_filter = env_filter.add_directive(directive.parse()?);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .try_init()?;
    }
    Ok(())
}

async fn run(config: WorkerConfig) -> anyhow::Result<()> {
    if let Some(addr) = config.metrics_addr {
        install_exporter(addr)?;
        info!("Serving Prometheus metrics on {}", addr);
    }

    let pipeline = build_pipeline(&config).await?;

    let Some(interval) = config.interval else {
        let summary = pipeline.run(window(&config)).await?;
        return print_summary(&summary);
    };

    info!("Running every {:?}", interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                return Ok(());
            }
            _ = ticker.tick() => match pipeline.run(window(&config)).await {
                Ok(summary) => print_summary(&summary)?,
                Err(e) if e.is_retryable() => error!("Run failed, retrying next tick: {}", e),
                Err(e) => return Err(e.into()),
            },
        }
    }
}

async fn build_pipeline(config: &WorkerConfig) -> anyhow::Result<Pipeline> {
    let pool = connect(&DbConfig::from_env()?)
        .await
        .context("connecting to Postgres")?;
    if config.ensure_schema {
        ensure_schema(&pool).await?;
    }

    let store = S3Client::from_env().await.context("creating S3 client")?;

    let mut runner = FfmpegRunner::new().with_timeout(config.encode_timeout);
    if let Some(binary) = config.ffmpeg_binary() {
        runner = runner.with_binary(binary);
    }
    let spec = SlideshowSpec::default().with_seconds_per_photo(config.seconds_per_photo);

    Ok(Pipeline::new(
        config,
        Arc::new(PgPhotoRepository::new(pool.clone())),
        Arc::new(PgVideoRepository::new(pool)),
        Arc::new(store),
        Arc::new(FfmpegSlideshow::new(spec, runner)),
    ))
}

fn window(config: &WorkerConfig) -> SelectionWindow {
    SelectionWindow::trailing(Utc::now(), config.window_length())
}

fn print_summary(summary: &RunSummary) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(summary)?);
    Ok(())
}
