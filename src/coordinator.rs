//! Orchestration of cache, pool, and engine for screenshot requests.
//!
//! The coordinator is what the HTTP layer talks to. It answers fresh cache
//! hits immediately, and on a miss elects a single leader per cache key so
//! that any number of concurrent requests for the same URL cost exactly one
//! render. Waiters block on the shared in-flight handle; nothing polls.

use crate::cache::{cache_key, CacheStore};
use crate::engine::RenderEngine;
use crate::pool::WorkerPool;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Outcome of one render, fanned out to every waiter for the key.
type Outcome = Result<PathBuf>;

/// Coordinates screenshot requests across the cache and the worker pool.
///
/// Cloning is cheap; all clones share the same cache, pool, and in-flight
/// map, so one coordinator per process is constructed at startup and handed
/// to the HTTP layer.
#[derive(Clone)]
pub struct RenderCoordinator {
    cache: CacheStore,
    pool: WorkerPool,
    engine: Arc<dyn RenderEngine>,
    in_flight: Arc<Mutex<HashMap<String, broadcast::Sender<Outcome>>>>,
}

impl RenderCoordinator {
    pub fn new(cache: CacheStore, pool: WorkerPool, engine: Arc<dyn RenderEngine>) -> Self {
        Self {
            cache,
            pool,
            engine,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Return the path of a fresh artifact for `url`, rendering it first if
    /// the cache has nothing fresh enough.
    ///
    /// Concurrent calls for the same URL are deduplicated: one render runs,
    /// everyone gets its outcome. A failed render leaves the cache exactly
    /// as it was, stale entry included, and reports the failure to every
    /// waiter; the next independent request starts a fresh attempt.
    pub async fn get_screenshot(&self, url: &str) -> Result<PathBuf> {
        let key = cache_key(url)?;

        if let Some(entry) = self.cache.lookup_key(&key) {
            if self.cache.is_fresh(&entry) {
                debug!(url, path = %entry.path.display(), "cache hit");
                return Ok(entry.path);
            }
            debug!(url, "cache entry stale, re-rendering");
        }

        // Join the in-flight render for this key, or become its leader.
        // The check-or-create must stay atomic under the lock so two leaders
        // can never form for one key.
        let mut rx = {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| Error::Other("in-flight map poisoned".to_string()))?;

            match in_flight.get(&key) {
                Some(tx) => {
                    debug!(url, "joining in-flight render");
                    tx.subscribe()
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    in_flight.insert(key.clone(), tx);
                    self.spawn_leader(url.to_string(), key.clone());
                    rx
                }
            }
        };

        // The render task outlives any individual request: a waiter that is
        // dropped here stops waiting, the render itself carries on.
        match rx.recv().await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Other("render task ended without a result".to_string())),
        }
    }

    /// Run the actual render on a detached task and resolve the in-flight
    /// handle with its outcome.
    fn spawn_leader(&self, url: String, key: String) {
        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.render_and_store(&url, &key).await;
            if let Err(err) = &outcome {
                warn!(url, error = %err, "render failed");
            }

            // Remove before notifying so a request arriving after the
            // failure starts a fresh attempt instead of observing a
            // resolved handle.
            let tx = match this.in_flight.lock() {
                Ok(mut in_flight) => in_flight.remove(&key),
                Err(_) => None,
            };
            if let Some(tx) = tx {
                // No receivers left just means every requester went away
                let _ = tx.send(outcome);
            }
        });
    }

    async fn render_and_store(&self, url: &str, key: &str) -> Result<PathBuf> {
        let worker = self.pool.acquire().await?;
        debug!(url, slot = worker.id(), "render slot acquired");

        let staging = self.cache.staging_path(key);
        let rendered = self.engine.render(url, &staging).await;

        // Slot goes back before the artifact is published; publication does
        // not need rendering capacity. The guard would also release on an
        // early return or panic.
        drop(worker);

        rendered?;
        let entry = self.cache.publish(key, &staging)?;
        info!(url, path = %entry.path.display(), "rendered and cached");
        Ok(entry.path)
    }
}
