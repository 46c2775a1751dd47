//!
//! src/main.rs
//!
//! Wires configuration, logging, the ledger, the catalog client and the
//! analyzer into one scan run over the configured library root.
//!

mod config;
mod errors;
mod frame;
mod identity;
mod imager;
mod ledger;
mod logging;
mod scanner;
mod submit;
mod types;

use tracing::{info, warn};

use crate::errors::ScanError;

#[tokio::main]
async fn main() -> Result<(), ScanError> {
    let cfg = config::load_config()?;
    let _guard = logging::init_logging(&cfg.logging)?;

    info!(
        service = "waveplot-scanner",
        version = %env!("CARGO_PKG_VERSION"),
        protocol = config::PROTOCOL_VERSION,
        "starting"
    );

    let ledger = match ledger::Ledger::open(&cfg.persistence).await {
        Ok(ledger) => {
            match ledger.count().await {
                Ok(entries) => info!(entries, db = %cfg.persistence.db_url, "ledger.open"),
                Err(e) => warn!(error = %e, "ledger.count"),
            }
            Some(ledger)
        }
        Err(e) => {
            warn!(error = %e, "ledger unavailable; every file will be re-checked remotely");
            None
        }
    };

    let client = submit::WavePlotClient::new(&cfg.http, &cfg.remote)?;
    let scanner = scanner::Scanner::new(
        cfg.scan.clone(),
        ledger,
        client,
        identity::TagIdentityReader,
        imager::ImagerInvoker::new(cfg.imager.clone()),
    );

    let shutdown = scanner.shutdown();
    let trigger = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current file");
            shutdown.cancel();
        }
    });

    let report = scanner.run().await?;
    trigger.abort();

    info!(summary = %serde_json::to_string(&report).unwrap_or_default(), "scan.done");
    Ok(())
}
