//! Render engine abstraction and the external-command implementation.
//!
//! The service never renders anything itself; it hands a URL to an external
//! engine binary and expects an image artifact at the destination path when
//! the process exits. The trait keeps pool and cache logic independent of
//! the engine binary, and lets tests substitute a mock.

use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Capability interface for producing a screenshot artifact.
///
/// `render` must either leave a complete image at `dest` and return `Ok`,
/// or return an error and leave the cache-visible state untouched. Each
/// call is independent; no engine state persists across calls.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn render(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Renders by spawning an external engine process per call.
///
/// The engine binary is invoked as `program [args..] <url> <dest>` and is
/// expected to write the image to `dest` and exit zero. A process that
/// outlives the configured timeout is killed so it cannot starve a worker
/// slot forever.
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl RenderEngine for CommandEngine {
    async fn render(&self, url: &str, dest: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .arg(dest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::EngineUnavailable(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let mut stderr = child.stderr.take();
        let mut stderr_buf = String::new();

        let waited = tokio::time::timeout(self.timeout, async {
            // stderr reaches EOF when the process exits, so reading first
            // cannot deadlock on a full pipe
            if let Some(err) = stderr.as_mut() {
                let _ = err.read_to_string(&mut stderr_buf).await;
            }
            child.wait().await
        })
        .await;

        let status = match waited {
            Ok(res) => res.map_err(|e| Error::EngineUnavailable(format!("wait failed: {}", e)))?,
            Err(_) => {
                let millis = self.timeout.as_millis() as u64;
                warn!(url, millis, "render engine timed out, killing process");
                let _ = child.start_kill();
                let _ = child.wait().await;
                let _ = std::fs::remove_file(dest);
                return Err(Error::RenderTimeout(millis));
            }
        };

        if !status.success() {
            let _ = std::fs::remove_file(dest);
            let detail = stderr_buf.trim();
            return Err(Error::EngineUnavailable(format!(
                "engine exited with {}{}{}",
                status,
                if detail.is_empty() { "" } else { ": " },
                detail
            )));
        }

        // A clean exit with nothing (or an empty file) at the destination is
        // a failure, not an empty success
        match tokio::fs::metadata(dest).await {
            Ok(meta) if meta.len() > 0 => {
                debug!(url, bytes = meta.len(), "render complete");
                Ok(())
            }
            Ok(_) => {
                let _ = std::fs::remove_file(dest);
                Err(Error::NoArtifactProduced)
            }
            Err(_) => Err(Error::NoArtifactProduced),
        }
    }
}
