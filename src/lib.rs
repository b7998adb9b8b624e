//! Webshot
//!
//! A caching website screenshot service. An HTTP request names a target URL;
//! the service returns a rendered PNG, produced by delegating to a pool of
//! external rendering workers and serving cached artifacts while they are
//! fresh.
//!
//! # Architecture
//!
//! - **[`CacheStore`]**: maps each URL to a deterministic on-disk artifact
//!   path and judges freshness at lookup time against a retention window.
//! - **[`WorkerPool`]**: a fixed set of worker slots bounding how many
//!   renders run concurrently, FIFO-fair, released via RAII.
//! - **[`RenderEngine`]**: capability interface over the external rendering
//!   binary; [`CommandEngine`] spawns one process per render with a bounded
//!   timeout.
//! - **[`RenderCoordinator`]**: ties the three together and deduplicates
//!   concurrent requests for the same URL down to a single render.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use webshot::{CacheStore, CommandEngine, RenderCoordinator, WorkerPool};
//!
//! # #[tokio::main]
//! # async fn main() -> webshot::Result<()> {
//! let cache = CacheStore::new("/tmp/webshot", Duration::from_secs(3 * 60 * 60))?;
//! let pool = WorkerPool::new(5, None);
//! let engine = Arc::new(CommandEngine::new(
//!     "wkhtmltoimage",
//!     vec![],
//!     Duration::from_secs(30),
//! ));
//!
//! let coordinator = RenderCoordinator::new(cache, pool, engine);
//! let path = coordinator.get_screenshot("https://example.com").await?;
//! println!("artifact at {}", path.display());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod cache;
pub use cache::{cache_key, CacheEntry, CacheStore};

pub mod pool;
pub use pool::{PooledWorker, WorkerPool, WorkerSlot};

pub mod engine;
pub use engine::{CommandEngine, RenderEngine};

pub mod coordinator;
pub use coordinator::RenderCoordinator;

pub mod server;
pub use server::{router, AppState};

/// Process-wide configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP listener binds to
    pub port: u16,
    /// Number of worker slots in the render pool
    pub workers: usize,
    /// How long a cached artifact stays fresh
    pub retention: Duration,
    /// Directory artifacts are cached under
    pub cache_dir: PathBuf,
    /// External rendering binary, invoked as `program [args..] <url> <dest>`
    pub engine_program: PathBuf,
    /// Extra arguments placed before the URL and destination
    pub engine_args: Vec<String>,
    /// Bound on how long one render may run
    pub render_timeout: Duration,
    /// Optional bound on waiting for a worker slot; `None` waits indefinitely
    pub acquire_timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 4004,
            workers: 5,
            retention: Duration::from_secs(3 * 60 * 60),
            cache_dir: PathBuf::from("/tmp/webshot"),
            engine_program: PathBuf::from("wkhtmltoimage"),
            engine_args: Vec::new(),
            render_timeout: Duration::from_secs(30),
            acquire_timeout: None,
        }
    }
}

impl ServiceConfig {
    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("worker pool size must be at least 1".into()));
        }
        if self.retention.is_zero() {
            return Err(Error::Config("cache retention must be positive".into()));
        }
        if self.render_timeout.is_zero() {
            return Err(Error::Config("render timeout must be positive".into()));
        }
        Ok(())
    }
}
