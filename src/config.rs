//! Client configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// HealthSync backend base URL, without trailing slash
    pub api_base_url: String,
    /// Where to send the user after a successful login
    pub dashboard_url: String,
    /// Local address the OAuth redirect lands on
    pub callback_addr: SocketAddr,
    /// JSON file holding the persisted session
    pub session_file: PathBuf,
    /// How long `login` waits for the provider redirect
    pub login_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&api_base_url)
            .map_err(|e| ConfigError::Invalid("API_BASE_URL", e.to_string()))?;

        let callback_addr = env::var("CALLBACK_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5173".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid("CALLBACK_ADDR", e.to_string())
            })?;

        let login_timeout_secs: u64 = env::var("LOGIN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid("LOGIN_TIMEOUT_SECS", e.to_string())
            })?;

        Ok(Self {
            api_base_url,
            dashboard_url: env::var("DASHBOARD_URL")
                .unwrap_or_else(|_| "http://localhost:5173/dashboard".to_string()),
            callback_addr,
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".healthsync/session.json")),
            login_timeout: Duration::from_secs(login_timeout_secs),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
