//!
//! src/ledger.rs
//!
//! Persistent scan ledger: one SQLite table keyed by file path recording
//! the last successfully submitted protocol version per file. Failed
//! attempts are never recorded, so they retry on the next run.
//!

use std::str::FromStr;

use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions};
use tracing::warn;

use crate::config::PersistenceConfig;
use crate::errors::ScanError;
use crate::types::LedgerEntry;

#[derive(Clone)]
pub struct Ledger {
    pool: Pool<Sqlite>,
}

impl Ledger {
    pub async fn open(cfg: &PersistenceConfig) -> Result<Self, ScanError> {
        let is_memory = cfg.db_url == "sqlite::memory:";

        let mut opts = SqliteConnectOptions::from_str(&cfg.db_url)?.create_if_missing(true);

        // WAL is file-only; synchronous FULL so each upsert is durable
        // before the next file is processed
        if !is_memory {
            opts = opts
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Full);
        }

        // single writer, single connection
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let this = Self { pool };
        if !this.schema_matches().await {
            warn!("scanned_files schema missing or stale; recreating (full re-scan)");
            this.reset_schema().await?;
        }
        Ok(this)
    }

    /// Probes for the exact expected shape. Any mismatch is handled by
    /// dropping and recreating the table, not by migration.
    async fn schema_matches(&self) -> bool {
        sqlx::query("SELECT file_path, waveplot_id, version, date FROM scanned_files LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .is_ok()
    }

    async fn reset_schema(&self) -> Result<(), ScanError> {
        sqlx::query("DROP TABLE IF EXISTS scanned_files")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r"
            CREATE TABLE scanned_files (
              file_path   TEXT PRIMARY KEY,
              waveplot_id TEXT,
              version     TEXT NOT NULL,
              date        INTEGER NOT NULL
            );
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    pub async fn lookup(&self, file_path: &str) -> Result<Option<LedgerEntry>, ScanError> {
        let row = sqlx::query(
            "SELECT file_path, waveplot_id, version, date FROM scanned_files WHERE file_path = ?1",
        )
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LedgerEntry {
            file_path: r.get("file_path"),
            waveplot_id: r.get("waveplot_id"),
            version: r.get("version"),
            date: r.get("date"),
        }))
    }

    /// Records a successful submission, replacing any previous entry for
    /// the path.
    pub async fn upsert(
        &self,
        file_path: &str,
        waveplot_id: Option<&str>,
        version: &str,
    ) -> Result<(), ScanError> {
        sqlx::query("INSERT OR REPLACE INTO scanned_files VALUES (?1, ?2, ?3, ?4)")
            .bind(file_path)
            .bind(waveplot_id)
            .bind(version)
            .bind(Self::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, ScanError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM scanned_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
