//!
//! src/errors.rs
//!
//! Defines the error taxonomy the scanner uses and conversions
//! from library error types.
//!

use thiserror::Error;

use crate::frame::FrameError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("analyzer error: {0}")]
    Analyzer(String),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self { ScanError::Http(e.to_string()) }
}

impl From<sqlx::Error> for ScanError {
    fn from(e: sqlx::Error) -> Self { ScanError::Db(e.to_string()) }
}
