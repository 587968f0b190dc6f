//! Configuration management for the web service
//!
//! Built once at startup and never mutated afterwards. Sources, later ones
//! winning:
//! 1. an optional `config.toml`
//! 2. environment variables (see `AppConfig::apply_env`)
//! 3. command line flags applied by the binary

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_PORT: u16 = 8080;
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0} is required but not set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Firestore,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: trip_llm::providers::gemini::DEFAULT_MODEL.to_string(),
            base_url: trip_llm::providers::gemini::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    /// Service-account key used for Firestore access.
    pub credentials_file: PathBuf,
    /// Public keys that sign Firebase ID tokens.
    pub jwks_url: String,
    /// `host:port` of a Firestore emulator; disables service-account auth.
    pub emulator_host: Option<String>,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            credentials_file: PathBuf::from("serviceAccountKey.json"),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            emulator_host: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Root directory of the file backend.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Firestore,
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub gemini: GeminiConfig,
    pub firebase: FirebaseConfig,
    pub store: StoreConfig,
    /// Bound on every external call (generation, identity keys, store).
    pub upstream_timeout_secs: u64,
    /// Extra generation attempts after a schema violation. 0 keeps the
    /// single-attempt behavior.
    pub schema_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            workers: 10,
            gemini: GeminiConfig::default(),
            firebase: FirebaseConfig::default(),
            store: StoreConfig::default(),
            upstream_timeout_secs: 30,
            schema_retries: 0,
        }
    }
}

impl AppConfig {
    /// Loads `path` (or `config.toml` when present) and applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Environment variables:
    /// - `APP_HOST`, `APP_PORT`
    /// - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`
    /// - `FIREBASE_PROJECT_ID`, `GOOGLE_APPLICATION_CREDENTIALS`,
    ///   `IDENTITY_JWKS_URL`, `FIRESTORE_EMULATOR_HOST`
    /// - `STORE_BACKEND` (`firestore` | `file`), `DATA_DIR`
    /// - `UPSTREAM_TIMEOUT_SECS`, `SCHEMA_RETRIES`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("APP_HOST") {
            self.host = host;
        }
        if let Some(port) = get("APP_PORT") {
            self.port = parse_number("APP_PORT", &port)?;
        }
        if let Some(api_key) = get("GEMINI_API_KEY") {
            self.gemini.api_key = Some(api_key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = get("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(project_id) = get("FIREBASE_PROJECT_ID") {
            self.firebase.project_id = Some(project_id);
        }
        if let Some(credentials) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            self.firebase.credentials_file = PathBuf::from(credentials);
        }
        if let Some(jwks_url) = get("IDENTITY_JWKS_URL") {
            self.firebase.jwks_url = jwks_url;
        }
        if let Some(emulator) = get("FIRESTORE_EMULATOR_HOST") {
            self.firebase.emulator_host = Some(emulator);
        }
        if let Some(backend) = get("STORE_BACKEND") {
            self.store.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "firestore" => StoreBackend::Firestore,
                "file" => StoreBackend::File,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "STORE_BACKEND",
                        value: backend,
                    })
                }
            };
        }
        if let Some(data_dir) = get("DATA_DIR") {
            self.store.data_dir = PathBuf::from(data_dir);
        }
        if let Some(timeout) = get("UPSTREAM_TIMEOUT_SECS") {
            self.upstream_timeout_secs = parse_number("UPSTREAM_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(retries) = get("SCHEMA_RETRIES") {
            self.schema_retries = parse_number("SCHEMA_RETRIES", &retries)?;
        }
        Ok(())
    }

    /// Checks the settings the service cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_key.is_none() {
            return Err(ConfigError::Missing("GEMINI_API_KEY"));
        }
        if self.store.backend == StoreBackend::Firestore && self.firebase.project_id.is_none() {
            return Err(ConfigError::Missing("FIREBASE_PROJECT_ID"));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "UPSTREAM_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
