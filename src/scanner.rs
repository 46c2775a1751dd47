//!
//! src/scanner.rs
//!
//! Walks the library tree and drives the per-file pipeline:
//! identity -> ledger -> remote existence check -> analyze -> decode ->
//! submit -> ledger update. No single file's failure aborts the walk.
//!

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::errors::ScanError;
use crate::frame;
use crate::identity::IdentityReader;
use crate::imager::Analyzer;
use crate::ledger::Ledger;
use crate::submit::WavePlotClient;

/// Terminal state of one file's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    IdentitySkip,
    LedgerSkip,
    RemoteSkip,
    Submitted,
    AnalyzerFailed,
    FrameFailed,
    NetworkFailed,
}

/// Per-run tally, one counter per terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_seen: u64,
    pub identity_skipped: u64,
    pub ledger_skipped: u64,
    pub remote_skipped: u64,
    pub submitted: u64,
    pub analyzer_failed: u64,
    pub frame_failed: u64,
    pub network_failed: u64,
}

impl ScanReport {
    fn tally(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::IdentitySkip => self.identity_skipped += 1,
            FileOutcome::LedgerSkip => self.ledger_skipped += 1,
            FileOutcome::RemoteSkip => self.remote_skipped += 1,
            FileOutcome::Submitted => self.submitted += 1,
            FileOutcome::AnalyzerFailed => self.analyzer_failed += 1,
            FileOutcome::FrameFailed => self.frame_failed += 1,
            FileOutcome::NetworkFailed => self.network_failed += 1,
        }
    }
}

/// Depth-first walk, deterministic sibling order, symlinks not followed.
fn collect_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "walk.entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Ledger keys are canonical paths so reruns from a different working
/// directory still hit the same entry.
fn ledger_key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

pub struct Scanner<I, A> {
    cfg: ScanConfig,
    ledger: Option<Ledger>,
    client: WavePlotClient,
    identity: I,
    analyzer: A,
    shutdown: CancellationToken,
}

impl<I, A> Scanner<I, A>
where
    I: IdentityReader,
    A: Analyzer,
{
    pub fn new(
        cfg: ScanConfig,
        ledger: Option<Ledger>,
        client: WavePlotClient,
        identity: I,
        analyzer: A,
    ) -> Self {
        Self {
            cfg,
            ledger,
            client,
            identity,
            analyzer,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        info!(
            root = %self.cfg.root.display(),
            version = %self.cfg.version,
            schema = self.cfg.frame_schema.as_str(),
            "scan.start"
        );

        let files = collect_files(&self.cfg.root);
        let mut report = ScanReport::default();

        for path in files {
            if self.shutdown.is_cancelled() {
                info!(seen = report.files_seen, "scan.cancelled");
                break;
            }
            report.files_seen += 1;
            report.tally(self.process_file(&path).await);
        }

        Ok(report)
    }

    async fn process_file(&self, path: &Path) -> FileOutcome {
        let Some(identity) = self.identity.identify(path) else {
            return FileOutcome::IdentitySkip;
        };
        if !identity.is_complete() {
            debug!(file = %path.display(), "identity.incomplete");
            return FileOutcome::IdentitySkip;
        }

        let key = ledger_key(path);

        if let Some(ledger) = &self.ledger {
            match ledger.lookup(&key).await {
                Ok(Some(entry)) if entry.version == self.cfg.version => {
                    debug!(file = %path.display(), "ledger.current");
                    return FileOutcome::LedgerSkip;
                }
                Ok(_) => {}
                // degraded: treat as absent and fall through to the
                // remote check
                Err(e) => warn!(error = %e, file = %path.display(), "ledger.lookup"),
            }
        }

        match self.client.exists(&identity).await {
            Ok(true) => {
                debug!(file = %path.display(), "remote.known");
                return FileOutcome::RemoteSkip;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, file = %path.display(), "remote.exists");
                return FileOutcome::NetworkFailed;
            }
        }

        info!(file = %path.display(), "file.analyze");
        let raw = match self.analyzer.analyze(path, &self.cfg.version).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, file = %path.display(), "imager error - skipped file");
                return FileOutcome::AnalyzerFailed;
            }
        };

        let analysis = match frame::decode(&raw, self.cfg.frame_schema) {
            Ok(analysis) => analysis,
            Err(e) => {
                error!(error = %e, file = %path.display(), "frame.mismatch");
                return FileOutcome::FrameFailed;
            }
        };

        let outcome = match self.client.submit(&identity, &analysis, &self.cfg.version).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, file = %path.display(), "submit.failed");
                return FileOutcome::NetworkFailed;
            }
        };

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.upsert(&key, outcome.id(), &self.cfg.version).await {
                warn!(error = %e, file = %path.display(), "ledger.update");
            }
        }

        info!(
            file = %path.display(),
            dr = analysis.dynamic_range,
            id = outcome.id().unwrap_or("-"),
            "file.submitted"
        );
        FileOutcome::Submitted
    }
}
