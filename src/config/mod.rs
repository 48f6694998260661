//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `LIBRARIAN_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{DEFAULT_COLLECTION_NAME, DEFAULT_EMBEDDING_DIM, DimConfig};
use crate::embedding::{DevicePreference, EncoderConfig};

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `LIBRARIAN_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Collection holding the books. Default: `books`.
    pub collection: String,

    /// Path to the embedding model file (GGUF). Unset runs the stub encoder.
    pub model_path: Option<PathBuf>,

    /// Path to `tokenizer.json`. Default: next to the model.
    pub tokenizer_path: Option<PathBuf>,

    /// Stored vector dimension. Default: `1024`.
    pub embedding_dim: usize,

    /// Compute device for the encoder. Default: `auto`.
    pub device: DevicePreference,

    /// Aladin TTB key. Unset leaves the catalog routes unconfigured.
    pub aladin_api_key: Option<String>,

    /// Timeout for outbound calls (Qdrant, catalog). Default: `10`.
    pub http_timeout_secs: u64,
}

/// Default Qdrant URL used when `LIBRARIAN_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION_NAME.to_string(),
            model_path: None,
            tokenizer_path: None,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            device: DevicePreference::Auto,
            aladin_api_key: None,
            http_timeout_secs: 10,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "LIBRARIAN_PORT";
    const ENV_BIND_ADDR: &'static str = "LIBRARIAN_BIND_ADDR";
    const ENV_QDRANT_URL: &'static str = "LIBRARIAN_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "LIBRARIAN_COLLECTION";
    const ENV_MODEL_PATH: &'static str = "LIBRARIAN_MODEL_PATH";
    const ENV_TOKENIZER_PATH: &'static str = "LIBRARIAN_TOKENIZER_PATH";
    const ENV_EMBEDDING_DIM: &'static str = "LIBRARIAN_EMBEDDING_DIM";
    const ENV_DEVICE: &'static str = "LIBRARIAN_DEVICE";
    const ENV_ALADIN_API_KEY: &'static str = "LIBRARIAN_ALADIN_API_KEY";
    const ENV_HTTP_TIMEOUT_SECS: &'static str = "LIBRARIAN_HTTP_TIMEOUT_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let collection = Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection);
        let model_path = Self::parse_optional_path_from_env(Self::ENV_MODEL_PATH);
        let tokenizer_path = Self::parse_optional_path_from_env(Self::ENV_TOKENIZER_PATH);
        let embedding_dim = Self::parse_number_from_env(
            Self::ENV_EMBEDDING_DIM,
            defaults.embedding_dim as u64,
        )? as usize;
        let device = Self::parse_device_from_env(defaults.device)?;
        let aladin_api_key = Self::parse_optional_string_from_env(Self::ENV_ALADIN_API_KEY);
        let http_timeout_secs =
            Self::parse_number_from_env(Self::ENV_HTTP_TIMEOUT_SECS, defaults.http_timeout_secs)?;

        Ok(Self {
            port,
            bind_addr,
            qdrant_url,
            collection,
            model_path,
            tokenizer_path,
            embedding_dim,
            device,
            aladin_api_key,
            http_timeout_secs,
        })
    }

    /// Validates paths and basic invariants (no side effects).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dim_config().validate()?;

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        if self.collection.trim().is_empty() {
            return Err(ConfigError::EmptyCollection);
        }

        if let Some(ref path) = self.model_path {
            Self::require_file(path)?;
            Self::require_file(&self.resolved_tokenizer_path(path))?;
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn dim_config(&self) -> DimConfig {
        DimConfig::new(self.embedding_dim)
    }

    /// Encoder settings; stub mode when no model path is configured.
    pub fn encoder_config(&self) -> EncoderConfig {
        let config = match &self.model_path {
            Some(model_path) => EncoderConfig::new(model_path)
                .with_tokenizer_path(self.resolved_tokenizer_path(model_path)),
            None => EncoderConfig::stub(),
        };

        config
            .with_embedding_dim(self.embedding_dim)
            .with_device(self.device)
    }

    fn resolved_tokenizer_path(&self, model_path: &Path) -> PathBuf {
        self.tokenizer_path.clone().unwrap_or_else(|| {
            model_path
                .parent()
                .map(|p| p.join("tokenizer.json"))
                .unwrap_or_else(|| PathBuf::from("tokenizer.json"))
        })
    }

    fn require_file(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_device_from_env(default: DevicePreference) -> Result<DevicePreference, ConfigError> {
        match env::var(Self::ENV_DEVICE) {
            Ok(value) => value
                .parse()
                .map_err(|reason| ConfigError::InvalidDevice { reason }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        Self::parse_optional_string_from_env(var_name).map(PathBuf::from)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_number_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value.parse().map_err(|e| ConfigError::InvalidNumber {
                name: var_name,
                value,
                source: e,
            }),
            None => Ok(default),
        }
    }
}
