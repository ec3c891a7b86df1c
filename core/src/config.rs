/// Configuration for the file name translator
use crate::ai::{default_system_prompt, ProviderKind, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use zip::CompressionMethod;

pub const DEFAULT_API_KEY_ENV: &str = "QWEN_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write config file: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderOptions {
    pub kind: ProviderKind,
    /// Falls back to the provider's public endpoint when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_key_env: String,
    /// `.env` file to load before resolving the key; searched upward from the cwd when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<PathBuf>,
    pub source_lang: String,
    pub target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Qwen,
            endpoint: None,
            model: "qwen-max".into(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.into(),
            env_file: None,
            source_lang: "auto".into(),
            target_lang: "en".into(),
            system_prompt: None,
            request_timeout_secs: 30,
        }
    }
}

/// Load a `.env` file into the process environment without overriding existing variables
pub fn load_env_file(path: Option<&Path>) -> Result<PathBuf, dotenvy::Error> {
    match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    }
}

impl ProviderOptions {
    /// Explicit key first, then the configured environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        let explicit = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        explicit.or_else(|| {
            std::env::var(&self.api_key_env)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            endpoint: self
                .endpoint
                .clone()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| self.kind.default_endpoint().to_string()),
            api_key: self.resolved_api_key(),
            model: self.model.trim().to_string(),
            system_prompt: self
                .system_prompt
                .clone()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default_system_prompt(&self.source_lang, &self.target_lang)),
            timeout: self.request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    pub max_concurrency: usize,
    /// Translate only the stem and re-attach the original extension
    pub keep_extension: bool,
    /// Pass names detected as English through without a request
    pub skip_english_names: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            keep_extension: false,
            skip_english_names: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveCompression {
    #[default]
    Stored,
    Deflated,
}

impl ArchiveCompression {
    pub fn method(&self) -> CompressionMethod {
        match self {
            ArchiveCompression::Stored => CompressionMethod::Stored,
            ArchiveCompression::Deflated => CompressionMethod::Deflated,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveOptions {
    pub compression: ArchiveCompression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingOptions {
    pub jsonl_logging: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            jsonl_logging: true,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslatorConfig {
    pub provider: ProviderOptions,
    pub batch: BatchOptions,
    pub archive: ArchiveOptions,
    pub logging: LoggingOptions,
}

impl TranslatorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file, picked by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
        if is_yaml_path(path) {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = if is_yaml_path(path) {
            self.to_yaml()?
        } else {
            self.to_json()?
        };
        fs::write(path, content).map_err(ConfigError::Write)
    }
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false)
}

/// Keep the first four characters of a secret for log output
pub fn mask_api_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.chars().count() > 4 {
        let prefix: String = trimmed.chars().take(4).collect();
        format!("{}...", prefix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert_eq!(config.provider.kind, ProviderKind::Qwen);
        assert_eq!(config.provider.model, "qwen-max");
        assert_eq!(config.provider.api_key_env, "QWEN_API_KEY");
        assert_eq!(config.batch.max_concurrency, 4);
        assert!(!config.batch.keep_extension);
        assert_eq!(config.archive.compression, ArchiveCompression::Stored);
        assert!(config.logging.jsonl_logging);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TranslatorConfig::from_json(
            r#"{"provider":{"kind":"openai_compatible","targetLang":"ja"},"batch":{"maxConcurrency":8}}"#,
        )
        .unwrap();
        assert_eq!(config.provider.kind, ProviderKind::OpenaiCompatible);
        assert_eq!(config.provider.target_lang, "ja");
        assert_eq!(config.provider.model, "qwen-max");
        assert_eq!(config.batch.max_concurrency, 8);
        assert!(!config.batch.skip_english_names);
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("translator.yaml");

        let mut config = TranslatorConfig::default();
        config.archive.compression = ArchiveCompression::Deflated;
        config.batch.keep_extension = true;
        config.to_file(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("compression: deflated"));

        let loaded = TranslatorConfig::from_file(&path).unwrap();
        assert_eq!(loaded.archive.compression, ArchiveCompression::Deflated);
        assert!(loaded.batch.keep_extension);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            TranslatorConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_settings_defaults() {
        let mut provider = ProviderOptions::default();
        provider.api_key = Some(" sk-test ".into());
        provider.api_key_env = "FILENAME_TRANSLATOR_TEST_UNSET_KEY".into();

        let settings = provider.settings();
        assert_eq!(settings.endpoint, crate::ai::qwen::DEFAULT_ENDPOINT);
        assert_eq!(settings.api_key.as_deref(), Some("sk-test"));
        assert!(settings.system_prompt.contains("English"));
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_key_from_env() {
        let provider = ProviderOptions {
            api_key_env: "FILENAME_TRANSLATOR_TEST_ENV_KEY".into(),
            ..ProviderOptions::default()
        };
        std::env::set_var("FILENAME_TRANSLATOR_TEST_ENV_KEY", "sk-from-env");
        assert_eq!(provider.resolved_api_key().as_deref(), Some("sk-from-env"));
        std::env::remove_var("FILENAME_TRANSLATOR_TEST_ENV_KEY");
        assert_eq!(provider.resolved_api_key(), None);
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("sk-1234567890"), "sk-1...");
        assert_eq!(mask_api_key("abc"), "***");
    }

    #[test]
    fn test_api_key_from_env_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "FILENAME_TRANSLATOR_DOTENV_KEY=sk-from-dotenv\n").unwrap();

        let mut provider = ProviderOptions::default();
        provider.api_key_env = "FILENAME_TRANSLATOR_DOTENV_KEY".into();
        provider.env_file = Some(path.clone());

        assert_eq!(load_env_file(provider.env_file.as_deref()).unwrap(), path);
        assert_eq!(provider.resolved_api_key().as_deref(), Some("sk-from-dotenv"));
    }

    #[test]
    fn test_missing_env_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(load_env_file(Some(&dir.path().join("absent.env"))).is_err());
    }
}
