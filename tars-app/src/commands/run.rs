use crate::config::AppConfig;
use crate::notify::build_notifier;
use crate::report::{ActionCounter, RunReport};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tars_core::{load_worker_config, CancellationSignal, ModelClient, RoundDriver, WorkerConfig};
use tars_providers::OpenAiCompatibleClient;
use tars_tools::default_registry;
use tracing::info;

/// Load the named worker, run `task` once and report the outcome.
pub async fn run(
    config: &AppConfig,
    worker: &str,
    task: &str,
    context: Option<&str>,
    cancellation: CancellationSignal,
) -> Result<RunReport> {
    let worker_path = config.worker_path(worker);
    let worker_config = load_worker_config(&worker_path)
        .with_context(|| format!("Failed to load worker '{}'", worker))?;

    let model: Arc<dyn ModelClient> = Arc::new(OpenAiCompatibleClient::new(config.provider.clone())?);
    let fallback = match &config.fallback {
        Some(fallback) => {
            Some(Arc::new(OpenAiCompatibleClient::new(fallback.clone())?) as Arc<dyn ModelClient>)
        }
        None => None,
    };

    info!(
        "Running worker {} with model {}",
        worker_config.name, config.provider.model
    );
    execute(config, worker_config, model, fallback, cancellation, task, context).await
}

/// Build the driver for `worker_config` against the given model clients and run it.
pub async fn execute(
    config: &AppConfig,
    worker_config: WorkerConfig,
    model: Arc<dyn ModelClient>,
    fallback: Option<Arc<dyn ModelClient>>,
    cancellation: CancellationSignal,
    task: &str,
    context: Option<&str>,
) -> Result<RunReport> {
    std::fs::create_dir_all(&config.sandbox_dir).with_context(|| {
        format!(
            "Failed to create sandbox directory {}",
            config.sandbox_dir.display()
        )
    })?;

    let registry = default_registry(&config.sandbox_dir).restrict(&worker_config.actions)?;
    let specs = registry.select(&worker_config.actions)?;
    let identity = worker_config
        .identity(specs)?
        .with_cancellation(cancellation);

    let counter = Arc::new(ActionCounter::default());
    let mut driver = RoundDriver::new(identity, model, Arc::new(registry))
        .with_notifier(build_notifier(&config.notifier))
        .with_observer(counter.clone())
        .with_options(worker_config.driver_options());
    if let Some(fallback) = fallback {
        driver = driver.with_fallback(fallback);
    }

    let started_at = Utc::now();
    let outcome = driver.run(task, context).await;

    Ok(RunReport {
        worker: worker_config.name,
        task: task.to_string(),
        started_at,
        finished_at: Utc::now(),
        actions: counter.count(),
        outcome,
    })
}
