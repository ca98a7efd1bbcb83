use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::pairing::dictionary::Dictionary;
use crate::pairing::{KeyStore, DEFAULT_KEY_LENGTH, DEFAULT_MAX_ATTEMPTS, DEFAULT_TTL};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pairing: PairingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Preset dictionary name (`alpha`, `digits`, `alnum`)
    pub dictionary: String,
    /// Custom alphabet; overrides `dictionary` when set
    pub alphabet: Option<String>,
    pub length: usize,
    pub ttl_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }
}

impl PairingConfig {
    pub fn dictionary(&self) -> anyhow::Result<Dictionary> {
        match &self.alphabet {
            Some(alphabet) => Dictionary::new(alphabet),
            None => Dictionary::from_name(&self.dictionary),
        }
    }

    /// Build a key store from these settings
    pub fn build_store(&self) -> anyhow::Result<KeyStore> {
        self.build_store_with(self.dictionary()?)
    }

    /// Build a key store around an already resolved dictionary
    pub fn build_store_with(&self, dictionary: Dictionary) -> anyhow::Result<KeyStore> {
        KeyStore::builder()
            .dictionary(dictionary)
            .key_length(self.length)
            .ttl(Duration::from_secs(self.ttl_secs))
            .max_attempts(self.max_attempts)
            .build()
    }
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            dictionary: "alpha".to_string(),
            alphabet: None,
            length: DEFAULT_KEY_LENGTH,
            ttl_secs: DEFAULT_TTL.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
