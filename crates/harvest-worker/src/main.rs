//! Harvest gate worker binary

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use harvest_core::config::StoreConfig;
use harvest_core::{PipelineOrchestrator, WorkQueue, WorkerConfig};
use harvest_shacl::ShaclEngine;
use harvest_sparql::{GraphStore, MemoryStore, SparqlHttpClient};
use harvest_worker::{init_logging, routes, VERSION};

/// SHACL quality gate for harvesting tasks
#[derive(Parser, Debug)]
#[command(name = "harvest-worker", version)]
struct Args {
    /// TOML configuration file
    #[arg(long, short, env = "HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Shape profile, overrides the configuration
    #[arg(long, env = "HARVEST_SHAPES_PATH")]
    shapes: Option<PathBuf>,

    /// Listen address, overrides the configuration
    #[arg(long)]
    bind: Option<String>,

    /// Use an in-process store instead of the SPARQL endpoint
    #[arg(long)]
    memory_store: bool,

    /// Log as JSON lines
    #[arg(long, env = "HARVEST_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs)?;

    let config = load_config(&args)?;
    tracing::info!(version = VERSION, endpoint = %config.store.endpoint, "starting harvest worker");

    let engine = ShaclEngine::from_file(&config.shapes_path)
        .with_context(|| format!("loading shapes from {}", config.shapes_path.display()))?;
    let store: Arc<dyn GraphStore> = if args.memory_store {
        tracing::warn!("using the in-process store, nothing is persisted");
        Arc::new(MemoryStore::new()?)
    } else {
        Arc::new(http_store(&config.store)?)
    };

    let orchestrator = PipelineOrchestrator::from_config(&config, store, engine)?;
    tracing::info!(operations = ?orchestrator.operations(), "pipelines registered");
    let (queue, dispatcher) = WorkQueue::start(Arc::new(orchestrator));

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address))?;
    let (bound, server) = warp::serve(routes(queue)).try_bind_with_graceful_shutdown(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for shutdown signal");
        }
    })?;
    tracing::info!(%bound, "listening");
    server.await;

    tracing::info!("shutting down, draining running tasks");
    dispatcher.await?;
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<WorkerConfig> {
    let mut config = match &args.config {
        Some(path) => WorkerConfig::from_toml_file(path)?,
        None => WorkerConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(shapes) = &args.shapes {
        config = config.with_shapes_path(shapes);
    }
    if let Some(bind) = &args.bind {
        config.server.bind_address.clone_from(bind);
    }
    config.validate()?;
    Ok(config)
}

fn http_store(config: &StoreConfig) -> anyhow::Result<SparqlHttpClient> {
    let mut client = SparqlHttpClient::with_timeouts(
        &config.endpoint,
        Duration::from_secs(config.connect_timeout_secs),
        Duration::from_secs(config.request_timeout_secs),
    )?
    .with_update_field(&config.update_field);
    if let Some(high_load) = &config.high_load_endpoint {
        client = client.with_high_load_endpoint(high_load);
    }
    Ok(client)
}
