// Main entry point for the content pipeline worker

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use completion_client::CompletionClient;
use pipeline_core::generator::{GenerationOptions, LlmArticleGenerator};
use pipeline_core::jobs::{PipelineWorker, PostgresJobStore, Sweeper, WorkerConfig};
use pipeline_core::publisher::WordPressPublisher;
use pipeline_core::retry::RetryPolicy;
use pipeline_core::Config;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordpress_client::WordPressClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pipeline_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting content pipeline worker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(sites = config.sites.len(), "Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let retry = RetryPolicy::default();

    // External clients
    let mut completion = CompletionClient::with_timeout(&config.openai_api_key, request_timeout)
        .context("Failed to build completion client")?;
    if let Some(base_url) = &config.openai_base_url {
        completion = completion.with_base_url(base_url);
    }

    let wordpress = WordPressClient::with_timeout(
        &config.wordpress_url,
        &config.wordpress_username,
        &config.wordpress_app_password,
        request_timeout,
    )
    .context("Failed to build WordPress client")?;

    // Pipeline components
    let store = Arc::new(PostgresJobStore::new(pool));
    let generator = Arc::new(LlmArticleGenerator::new(
        completion,
        GenerationOptions {
            model: config.openai_model.clone(),
            ..Default::default()
        },
        retry.clone(),
    ));
    let publisher = Arc::new(WordPressPublisher::new(wordpress, retry));

    let worker = PipelineWorker::new(
        Arc::clone(&store),
        generator,
        publisher,
        config.sites.clone(),
        WorkerConfig {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            ..Default::default()
        },
    );
    let sweeper = Sweeper::new(
        Arc::clone(&store),
        Duration::from_secs(config.sweep_interval_secs),
        Duration::from_secs(config.processing_timeout_secs),
    );

    // Run both services until ctrl-c
    let shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    shutdown.cancel();

    let (worker_result, sweeper_result) = tokio::join!(worker_handle, sweeper_handle);
    worker_result.context("Worker task panicked")??;
    sweeper_result.context("Sweeper task panicked")??;

    tracing::info!("Content pipeline worker stopped");
    Ok(())
}
