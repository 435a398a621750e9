use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HippocampusConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
}

/// Transport-facing settings. The engine does not bind sockets itself; these
/// are recorded here for the external adapter that mounts the tool surface.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub cache_dir: String,
}

impl Default for HippocampusConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/hippocampus.db".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_hippocampus_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

/// Returns `~/.hippocampus/`
pub fn default_hippocampus_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".hippocampus")
}

/// Returns the default config file path: `~/.hippocampus/config.toml`
pub fn default_config_path() -> PathBuf {
    default_hippocampus_dir().join("config.toml")
}

impl HippocampusConfig {
    /// Load config from the TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            HippocampusConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (HIPPOCAMPUS_DB, HIPPOCAMPUS_HOST,
    /// HIPPOCAMPUS_PORT, HIPPOCAMPUS_LOG_LEVEL, HIPPOCAMPUS_MODEL_CACHE).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HIPPOCAMPUS_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HIPPOCAMPUS_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("HIPPOCAMPUS_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("HIPPOCAMPUS_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("HIPPOCAMPUS_MODEL_CACHE") {
            self.embedding.cache_dir = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

/// Key material for the encrypted store. Read from the environment only;
/// never serialized, never written to disk, and the `Debug` impl is redacted
/// so it cannot leak through logs.
#[derive(Clone)]
pub struct Passphrase(String);

impl Passphrase {
    /// Read the passphrase from `HIPPOCAMPUS_PASSPHRASE`. Missing or empty is
    /// a fatal configuration error.
    pub fn from_env() -> Result<Self> {
        let value = std::env::var("HIPPOCAMPUS_PASSPHRASE")
            .context("HIPPOCAMPUS_PASSPHRASE must be set")?;
        anyhow::ensure!(!value.is_empty(), "HIPPOCAMPUS_PASSPHRASE must not be empty");
        Ok(Self(value))
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
