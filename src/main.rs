use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webshot::{AppState, CacheStore, CommandEngine, RenderCoordinator, ServiceConfig, WorkerPool};

#[derive(Parser, Debug)]
#[command(name = "webshot", version, about = "Caching website screenshot service")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 4004)]
    port: u16,

    /// Cache retention in seconds
    #[arg(long = "cache-secs", default_value_t = 10800)]
    cache_secs: u64,

    /// Number of render workers in the pool
    #[arg(long, default_value_t = 5)]
    workers: usize,

    /// Directory to cache rendered artifacts under
    #[arg(long = "cache-dir", default_value = "/tmp/webshot")]
    cache_dir: PathBuf,

    /// Rendering engine binary, invoked as `<engine> [engine-args..] <url> <output>`
    #[arg(long, default_value = "wkhtmltoimage")]
    engine: PathBuf,

    /// Extra argument for the engine binary (repeatable)
    #[arg(long = "engine-arg")]
    engine_args: Vec<String>,

    /// Kill a render that runs longer than this many seconds
    #[arg(long = "render-timeout-secs", default_value_t = 30)]
    render_timeout_secs: u64,

    /// Give up waiting for a free worker after this many seconds (unbounded if unset)
    #[arg(long = "acquire-timeout-secs")]
    acquire_timeout_secs: Option<u64>,
}

impl From<Args> for ServiceConfig {
    fn from(args: Args) -> Self {
        Self {
            port: args.port,
            workers: args.workers,
            retention: Duration::from_secs(args.cache_secs),
            cache_dir: args.cache_dir,
            engine_program: args.engine,
            engine_args: args.engine_args,
            render_timeout: Duration::from_secs(args.render_timeout_secs),
            acquire_timeout: args.acquire_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from(Args::parse());
    config.validate().context("invalid configuration")?;

    let cache = CacheStore::new(&config.cache_dir, config.retention)
        .context("failed to open cache directory")?;
    let pool = WorkerPool::new(config.workers, config.acquire_timeout);
    let engine = Arc::new(CommandEngine::new(
        &config.engine_program,
        config.engine_args.clone(),
        config.render_timeout,
    ));
    let coordinator = RenderCoordinator::new(cache, pool, engine);

    let app = webshot::router(AppState { coordinator });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("could not bind port {}", config.port))?;

    info!(
        port = config.port,
        workers = config.workers,
        cache_dir = %config.cache_dir.display(),
        retention_secs = config.retention.as_secs(),
        "running and listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}
