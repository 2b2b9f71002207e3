//! Configuration module for the Komuni backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Directory backing the object storage for report images
    pub upload_dir: PathBuf,
    /// URL prefix under which stored objects are reachable
    pub public_upload_url: String,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Base URL of the Nominatim-compatible geocoder
    pub geocoder_url: String,
    pub geocoder_timeout_secs: u64,
    /// Lifetime of a login session
    pub session_ttl_hours: i64,
    /// Accounts registered with one of these emails become administrators
    pub admin_emails: Vec<String>,
    /// Key granting access to the admin routes without a session
    pub admin_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("KOMUNI_DB_PATH")
            .unwrap_or_else(|_| "./data/komuni.sqlite".to_string())
            .into();

        let index_path = env::var("KOMUNI_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let upload_dir = env::var("KOMUNI_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let public_upload_url = env::var("KOMUNI_PUBLIC_UPLOAD_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "/uploads".to_string());

        let max_upload_bytes = parse_or("KOMUNI_MAX_UPLOAD_BYTES", 5 * 1024 * 1024);

        let bind_addr = env::var("KOMUNI_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid KOMUNI_BIND_ADDR format");

        let log_level = env::var("KOMUNI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("KOMUNI_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        };

        let geocoder_url = env::var("KOMUNI_GEOCODER_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());

        let geocoder_timeout_secs = parse_or("KOMUNI_GEOCODER_TIMEOUT_SECS", 5);
        let session_ttl_hours = parse_or("KOMUNI_SESSION_TTL_HOURS", 24 * 30);

        let admin_emails = env::var("KOMUNI_ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        let admin_api_key = env::var("KOMUNI_ADMIN_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        Self {
            db_path,
            index_path,
            upload_dir,
            public_upload_url,
            max_upload_bytes,
            bind_addr,
            log_level,
            log_format,
            geocoder_url,
            geocoder_timeout_secs,
            session_ttl_hours,
            admin_emails,
            admin_api_key,
        }
    }

    /// Whether an email is on the configured administrator list.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
