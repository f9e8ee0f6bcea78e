//! Example host application wiring: `Settings` → `AutoServerPool::start()`,
//! driven to completion with graceful shutdown. Not part of the library's
//! public surface — shows a consuming application how to assemble the core,
//! analogous to the teacher's `server::bootstrap::run` + `main.rs`.

use anyhow::Result;
use cache_autodiscovery::{config, runtime, AutoServerPool, Settings};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autodiscovery-demo", about = "Cache auto-discovery pool demo")]
struct Cli {
    /// Path to the pool's config file (TOML or JSON).
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let worker_threads = runtime::get_container_cpu_limit();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    rt.block_on(run(cli.config))
}

async fn run(config_path: PathBuf) -> Result<()> {
    config::init_tracing();

    let settings = Settings::load(&config_path)?;
    tracing::info!(
        "demo: loaded settings, cluster_endpoint={}:{}",
        settings.cluster_endpoint.hostname,
        settings.cluster_endpoint.port
    );

    let metrics = cache_autodiscovery::metrics::DiscoveryMetrics::install();

    let pool = AutoServerPool::new(&settings);
    pool.start().await?;

    let mut node_failed = pool.subscribe_node_failed();
    let watcher = tokio::spawn(async move {
        while let Ok(endpoint) = node_failed.recv().await {
            tracing::warn!("demo: node failed: {}", endpoint);
        }
    });

    tracing::info!("demo: pool running, metrics snapshot:\n{}", metrics.render());

    wait_for_shutdown().await;
    tracing::info!("demo: shutting down");

    pool.dispose().await;
    watcher.abort();
    Ok(())
}

async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}
