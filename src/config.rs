//!
//! src/config.rs
//!
//! Environment-driven configuration: remote catalog endpoint, HTTP
//! behaviour, analyzer executable, scan root and ledger location.
//! Every component receives its config value at construction.
//!

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::errors::ScanError;
use crate::frame::FrameSchema;

/// Protocol version passed to the analyzer and the catalog server.
/// Bumping it makes every ledger entry stale and eligible for re-scan.
pub const PROTOCOL_VERSION: &str = "CITRUS";

/// Constants for HTTP config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;

pub const RETRY_MAX_ATTEMPTS: usize = 3;
pub const RETRY_BACKOFF_MS: u64 = 500;

pub const DEFAULT_SERVER: &str = "http://pi.ockmore.net:19048";
pub const DEFAULT_DB_URL: &str = "sqlite:waveplot.db";

/// Wrapper over env::var to return an invalid environment var error
fn env_check(s: &str) -> Result<String, ScanError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ScanError::Config(format!("{s} was not set"))),
    }
}

fn env_or(s: &str, default: &str) -> String {
    std::env::var(s).unwrap_or_else(|_| default.to_string())
}

fn env_to_uint(s: &str, default: u64) -> u64 {
    match std::env::var(s) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) => value,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Ensures the server URL is plain http or https
fn ensure_web_scheme(url: &Url) -> Result<(), String> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("URL must be http or https, got {other}: {url}")),
    }
}

/// Parses the catalog base URL and normalizes it to a trailing slash so
/// endpoint joins resolve under it.
pub(crate) fn parse_server_url(raw: &str) -> Result<Url, ScanError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ScanError::Config(format!("server url invalid: {e}")))?;

    ensure_web_scheme(&url).map_err(ScanError::Config)?;

    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

///
/// Configuration for the remote catalog service
///
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub server_url: Url,
    pub editor_key: String,
}

fn build_remote() -> Result<RemoteConfig, ScanError> {
    let editor_key = env_check("WAVEPLOT_EDITOR_KEY")?;
    let server_url = parse_server_url(&env_or("WAVEPLOT_SERVER", DEFAULT_SERVER))?;
    Ok(RemoteConfig { server_url, editor_key })
}

///
/// Configuration for HTTP timeouts and retries
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            retry: RetryConfig::default(),
        }
    }
}

fn build_http() -> HttpConfig {
    let mut http = HttpConfig::default();
    http.retry.max_attempts = env_to_uint("WAVEPLOT_MAX_HTTP_ATTEMPTS", RETRY_MAX_ATTEMPTS as u64) as usize;
    http.retry.backoff = Duration::from_millis(env_to_uint("WAVEPLOT_HTTP_BACKOFF_MS", RETRY_BACKOFF_MS));
    http
}

///
/// Configuration for the external analyzer executable
///
#[derive(Debug, Clone)]
pub struct ImagerConfig {
    pub executable: PathBuf,
}

impl Default for ImagerConfig {
    fn default() -> Self {
        let name = if cfg!(windows) { "WavePlotImager.exe" } else { "WavePlotImager" };
        Self { executable: PathBuf::from(name) }
    }
}

fn build_imager() -> ImagerConfig {
    match std::env::var("WAVEPLOT_IMAGER") {
        Ok(path) if !path.trim().is_empty() => ImagerConfig { executable: PathBuf::from(path) },
        _ => ImagerConfig::default(),
    }
}

///
/// Configuration for the scan ledger store
///
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub db_url: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { db_url: DEFAULT_DB_URL.to_string() }
    }
}

///
/// Configuration for the directory walk
///
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub version: String,
    pub frame_schema: FrameSchema,
}

fn build_scan() -> Result<ScanConfig, ScanError> {
    let root = PathBuf::from(env_or("WAVEPLOT_SCAN_ROOT", "."));

    let variant = env_or("WAVEPLOT_FRAME_VARIANT", "classic");
    let frame_schema = FrameSchema::parse(&variant).ok_or_else(|| {
        ScanError::Config(format!("WAVEPLOT_FRAME_VARIANT must be classic or thumbs, got {variant}"))
    })?;

    Ok(ScanConfig {
        root,
        version: PROTOCOL_VERSION.to_string(),
        frame_schema,
    })
}

///
/// Configuration for the logger
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,waveplot_scanner=debug,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging() -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if env_or("WAVEPLOT_LOG_FORMAT", "pretty") == "json" {
        logging.format = LogFormat::Json;
    }
    logging
}

///
/// AppConfig holding everything the pipeline components are built from
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub http: HttpConfig,
    pub imager: ImagerConfig,
    pub persistence: PersistenceConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
}

///
/// Return all environment-derived settings to the caller at program start.
///
pub fn load_config() -> Result<AppConfig, ScanError> {
    dotenvy::dotenv().ok();

    let remote = build_remote()?;
    let http = build_http();
    let imager = build_imager();
    let persistence = PersistenceConfig {
        db_url: env_or("WAVEPLOT_DB", DEFAULT_DB_URL),
    };
    let scan = build_scan()?;
    let logging = build_logging();

    Ok(AppConfig { remote, http, imager, persistence, scan, logging })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_gets_trailing_slash() {
        let url = parse_server_url("http://localhost:19048").unwrap();
        assert_eq!(url.as_str(), "http://localhost:19048/");
        assert_eq!(url.join("submit").unwrap().as_str(), "http://localhost:19048/submit");
    }

    #[test]
    fn server_url_rejects_other_schemes() {
        assert!(parse_server_url("ftp://example.com").is_err());
        assert!(parse_server_url("not a url").is_err());
    }
}
