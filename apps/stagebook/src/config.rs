//! # Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `stagebook.toml` (or the file named by `--config`)
//! 3. `STAGEBOOK_*` environment variables
//! 4. Command-line flags (applied by the CLI)
//!
//! ```toml
//! database = "stagebook.redb"
//! backend = "redb"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! rate_limit = 100
//! cors_origins = ["http://localhost:3000"]
//! api_key = "change-me"
//! ```

use serde::{Deserialize, Serialize};
use stagebook_core::{Session, StagebookError};
use std::path::{Path, PathBuf};

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "stagebook.toml";

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default request body limit (2 MB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

// =============================================================================
// BACKEND
// =============================================================================

/// Where rows live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID redb database file.
    #[default]
    Redb,
    /// Volatile in-memory tables, lost on exit.
    Memory,
}

impl Backend {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::Memory => "memory",
        }
    }

    fn parse(value: &str) -> Result<Self, StagebookError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Self::Redb),
            "memory" => Ok(Self::Memory),
            other => Err(StagebookError::Validation(format!(
                "unknown backend '{other}' (expected redb or memory)"
            ))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second across all clients; 0 disables the limiter.
    pub rate_limit: u32,
    /// Allowed CORS origins. Empty means localhost only, `["*"]` means any.
    pub cors_origins: Vec<String>,
    /// When set, every route except `/health` requires `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: 100,
            cors_origins: Vec::new(),
            api_key: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: PathBuf,
    pub backend: Backend,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("stagebook.redb"),
            backend: Backend::Redb,
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, StagebookError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, StagebookError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            StagebookError::Storage(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(StagebookError::Validation(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            StagebookError::Storage(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, StagebookError> {
        toml::from_str(text)
            .map_err(|e| StagebookError::Serialization(format!("Invalid configuration: {e}")))
    }

    /// Overlay `STAGEBOOK_*` variables read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), StagebookError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(database) = var("STAGEBOOK_DATABASE") {
            self.database = PathBuf::from(database);
        }
        if let Some(backend) = var("STAGEBOOK_BACKEND") {
            self.backend = Backend::parse(&backend)?;
        }
        if let Some(host) = var("STAGEBOOK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("STAGEBOOK_PORT") {
            self.server.port = parse_number("STAGEBOOK_PORT", &port)?;
        }
        if let Some(limit) = var("STAGEBOOK_RATE_LIMIT") {
            self.server.rate_limit = parse_number("STAGEBOOK_RATE_LIMIT", &limit)?;
        }
        if let Some(origins) = var("STAGEBOOK_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(key) = var("STAGEBOOK_API_KEY") {
            self.server.api_key = Some(key);
        }
        Ok(())
    }

    /// Open a session on the configured backend.
    pub fn open_session(&self) -> Result<Session, StagebookError> {
        match self.backend {
            Backend::Redb => Session::with_redb(&self.database),
            Backend::Memory => Ok(Session::new()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StagebookError> {
    value
        .trim()
        .parse()
        .map_err(|_| StagebookError::Validation(format!("{key} must be a number (got '{value}')")))
}

// =============================================================================
// TESTS
// =============================================================================
