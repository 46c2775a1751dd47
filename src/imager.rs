//!
//! src/imager.rs
//!
//! Runs the external analyzer on one file and captures its stdout as an
//! opaque byte buffer. Spawn failures and non-zero exits are per-file
//! failures; the analyzer is never retried for the same file.
//!

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::ImagerConfig;
use crate::errors::ScanError;

/// Seam between the orchestrator and the analyzer subprocess.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, path: &Path, version: &str) -> Result<Vec<u8>, ScanError>;
}

#[derive(Debug, Clone)]
pub struct ImagerInvoker {
    cfg: ImagerConfig,
}

impl ImagerInvoker {
    pub fn new(cfg: ImagerConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Analyzer for ImagerInvoker {
    async fn analyze(&self, path: &Path, version: &str) -> Result<Vec<u8>, ScanError> {
        debug!(
            executable = %self.cfg.executable.display(),
            file = %path.display(),
            "imager.spawn"
        );

        // stdout is the framed payload (binary-safe); stderr is the
        // analyzer's progress chatter and passes through to the console
        let child = Command::new(&self.cfg.executable)
            .arg(path)
            .arg(version)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                ScanError::Analyzer(format!("spawn {}: {e}", self.cfg.executable.display()))
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ScanError::Analyzer(format!("wait: {e}")))?;

        if !output.status.success() {
            return Err(ScanError::Analyzer(format!(
                "{} exited with {}",
                self.cfg.executable.display(),
                output.status
            )));
        }

        Ok(output.stdout)
    }
}
