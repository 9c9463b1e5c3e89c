//! Bucketview entry point.
//!
//! Runs under the Lambda runtime when `AWS_LAMBDA_RUNTIME_API` is set and
//! as a local HTTP server otherwise.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucketview::storage::{MemoryStore, ObjectStore, S3Store};
use bucketview::{lambda, server, Config, Function, RunMode};

/// # Startup Sequence
/// 1. Load configuration and run mode from environment variables
/// 2. Initialize tracing (JSON lines under Lambda)
/// 3. Build the object store: local file or S3
/// 4. Build the function, which owns the process-wide cache
/// 5. Hand it to the Lambda runtime or the local server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    init_tracing(config.run_mode);

    info!(
        location = %config.location(),
        stage = %config.stage,
        timeout_ms = config.function_timeout.as_millis() as u64,
        cache_max_age_secs = config.cache_max_age.as_secs(),
        mode = ?config.run_mode,
        "configuration loaded"
    );

    let store: Arc<dyn ObjectStore> = match &config.local_data_file {
        Some(path) => {
            let body = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let store = MemoryStore::new();
            store.put_object(&config.location(), body);
            info!(path = %path.display(), "serving local data file");
            Arc::new(store)
        }
        None => Arc::new(S3Store::from_env(config.s3_endpoint_url.as_deref()).await),
    };

    let function = Arc::new(Function::new(&config, store)?);

    match config.run_mode {
        RunMode::Lambda => lambda::run(function)
            .await
            .map_err(|e| anyhow!("lambda runtime stopped: {e}")),
        RunMode::Local => server::serve(function, config.server_port).await,
    }
}

fn init_tracing(mode: RunMode) {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bucketview=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    match mode {
        RunMode::Lambda => registry
            .with(tracing_subscriber::fmt::layer().json().without_time())
            .init(),
        RunMode::Local => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
