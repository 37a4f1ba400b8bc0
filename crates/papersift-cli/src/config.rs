//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use papersift_extractor::ExtractorConfig;
use papersift_llm::anthropic::{DEFAULT_ENDPOINT, DEFAULT_MAX_RETRIES, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "papersift.toml";

/// Environment variable consulted when no key file is configured.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// LLM service settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathSettings,

    /// Rate limiting, truncation and parsing
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// LLM service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// File holding the API key; falls back to `ANTHROPIC_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    /// Retries for rate-limited or failed HTTP requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory scanned for documents
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// CSV file records are appended to
    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,

    /// JSON response cache
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Config {
    /// Load configuration from `path`, or defaults if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check every section for invalid values.
    pub fn validate(&self) -> Result<()> {
        self.extractor.validate().map_err(CliError::Config)?;
        if self.llm.model.trim().is_empty() {
            return Err(CliError::Config("llm.model must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve the API key from the key file or the environment.
    pub fn api_key(&self) -> Result<String> {
        if let Some(path) = &self.llm.api_key_file {
            let key = fs::read_to_string(path).map_err(|e| {
                CliError::Config(format!(
                    "Failed to read API key from {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "API key file {} is empty",
                    path.display()
                )));
            }
            return Ok(key.to_string());
        }

        env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CliError::Config(format!(
                    "No API key: set llm.api_key_file or {}",
                    API_KEY_ENV
                ))
            })
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_file: None,
            max_retries: default_max_retries(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            results_file: default_results_file(),
            cache_file: default_cache_file(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("papers")
}

fn default_results_file() -> PathBuf {
    PathBuf::from("gcr_resilience_extraction_results.csv")
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("prompt_cache/extraction_prompt_cache.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.paths.input_dir, PathBuf::from("papers"));
        assert_eq!(config.extractor.tokens_per_minute, 20_000);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("papersift.toml");

        let mut config = Config::default();
        config.llm.model = "claude-test".to_string();
        config.extractor.tokens_per_minute = 40_000;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("papersift.toml");
        fs::write(&path, "[paths]\ninput_dir = \"pdfs\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.paths.input_dir, PathBuf::from("pdfs"));
        assert_eq!(config.paths.cache_file, default_cache_file());
        assert_eq!(config.llm.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_invalid_extractor_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("papersift.toml");
        fs::write(&path, "[extractor]\ntruncation_ratio = 2.0\n").unwrap();

        assert!(matches!(Config::load(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_api_key_from_file() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("key.txt");
        fs::write(&key_path, "  sk-test-key\n").unwrap();

        let mut config = Config::default();
        config.llm.api_key_file = Some(key_path);
        assert_eq!(config.api_key().unwrap(), "sk-test-key");
    }

    #[test]
    fn test_empty_api_key_file() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("key.txt");
        fs::write(&key_path, "\n").unwrap();

        let mut config = Config::default();
        config.llm.api_key_file = Some(key_path);
        assert!(config.api_key().is_err());
    }
}
