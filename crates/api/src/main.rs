//! Trip Duration Service - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use inference_engine::ModelHandle;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_logging(&settings.logging)?;

    info!("=== Trip Duration Service v{} ===", env!("CARGO_PKG_VERSION"));

    let prometheus = if settings.server.prometheus {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    // The listener is not bound until the model is Ready; a load failure
    // ends the process.
    let model = Arc::new(ModelHandle::new(settings.model.clone()));
    model.begin_load()?;
    let loader = Arc::clone(&model);
    tokio::task::spawn_blocking(move || loader.finish_load())
        .await
        .context("model loader task panicked")?
        .context("model failed to load; refusing to serve")?;

    run_server(settings, model, prometheus).await?;

    info!("Trip duration service stopped");
    Ok(())
}
