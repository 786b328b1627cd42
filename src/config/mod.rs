//! Configuration module for the school site backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Connection settings for the hosted document store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the document store API
    pub base_url: String,
    /// Project the collections live in
    pub project_id: String,
    /// API key sent with every request
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file holding the content snapshot
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Key the content snapshot is stored under
    pub storage_key: String,
    /// Remote backend, present only when fully configured
    pub remote: Option<RemoteConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("SCHOOL_DB_PATH")
            .unwrap_or_else(|_| "./data/school.sqlite".to_string())
            .into();

        let index_path = env::var("SCHOOL_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("SCHOOL_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid SCHOOL_BIND_ADDR format");

        let log_level = env::var("SCHOOL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("SCHOOL_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let storage_key =
            env::var("SCHOOL_STORAGE_KEY").unwrap_or_else(|_| "school_site_data".to_string());

        Self {
            db_path,
            index_path,
            bind_addr,
            log_level,
            log_format,
            storage_key,
            remote: RemoteConfig::from_env(),
        }
    }
}

impl RemoteConfig {
    /// Detect the remote backend. All three of URL, project and key must be
    /// set and non-empty, otherwise the service runs local-only.
    fn from_env() -> Option<Self> {
        let base_url = non_empty_var("SCHOOL_REMOTE_URL")?;
        let project_id = non_empty_var("SCHOOL_REMOTE_PROJECT_ID")?;
        let api_key = non_empty_var("SCHOOL_REMOTE_API_KEY")?;

        let timeout_secs = env::var("SCHOOL_REMOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Some(Self {
            base_url,
            project_id,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
