use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod openai;
pub mod qwen;

pub use openai::OpenAiCompatibleTranslator;
pub use qwen::QwenTranslator;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranslationError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
    #[error("translation service error ({status}): {message}")]
    Service { status: String, message: String },
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("translation cancelled")]
    Cancelled,
    #[error("translator is not configured: {message}")]
    NotConfigured { message: String },
    #[error("file name is empty")]
    EmptyName,
    #[error("translation task failed: {message}")]
    Internal { message: String },
}

impl TranslationError {
    /// Stable identifier used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslationError::Network { .. } => "network",
            TranslationError::MalformedResponse { .. } => "malformed_response",
            TranslationError::Service { .. } => "service",
            TranslationError::Timeout { .. } => "timeout",
            TranslationError::Cancelled => "cancelled",
            TranslationError::NotConfigured { .. } => "not_configured",
            TranslationError::EmptyName => "empty_name",
            TranslationError::Internal { .. } => "internal",
        }
    }

    pub fn timeout(after: Duration) -> Self {
        TranslationError::Timeout {
            after_ms: duration_millis(after),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        TranslationError::MalformedResponse {
            message: message.into(),
        }
    }
}

/// A remote service that turns one file name into its translated form.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(&self, name: &str) -> Result<String, TranslationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Qwen,
    OpenaiCompatible,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Qwen => "Qwen",
            ProviderKind::OpenaiCompatible => "OpenAI-compatible",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Qwen => qwen::DEFAULT_ENDPOINT,
            ProviderKind::OpenaiCompatible => openai::DEFAULT_ENDPOINT,
        }
    }

    pub fn build(self, settings: ProviderSettings) -> Result<Arc<dyn Translator>, TranslationError> {
        match self {
            ProviderKind::Qwen => Ok(Arc::new(QwenTranslator::new(settings)?)),
            ProviderKind::OpenaiCompatible => {
                Ok(Arc::new(OpenAiCompatibleTranslator::new(settings)?))
            }
        }
    }
}

impl TryFrom<&str> for ProviderKind {
    type Error = TranslationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "qwen" | "dashscope" => Ok(ProviderKind::Qwen),
            "openai" | "openai_compatible" | "openai-compatible" => {
                Ok(ProviderKind::OpenaiCompatible)
            }
            other => Err(TranslationError::NotConfigured {
                message: format!("unsupported provider: {other}"),
            }),
        }
    }
}

/// Resolved connection settings shared by every provider client.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub timeout: Duration,
}

impl ProviderSettings {
    fn require_api_key(&self) -> Result<String, TranslationError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| TranslationError::NotConfigured {
                message: "API key is not set".into(),
            })
    }
}

/// Builds the instruction sent alongside every file name.
pub fn default_system_prompt(source_lang: &str, target_lang: &str) -> String {
    let target = language_label(target_lang);
    let source = source_lang.trim();
    if source.is_empty() || source.eq_ignore_ascii_case("auto") {
        format!(
            "You are a translator. Translate the following file name to {target}. \
             Only respond with the translation, no explanations or additional text."
        )
    } else {
        format!(
            "You are a translator. Translate the following file name from {} to {target}. \
             Only respond with the translation, no explanations or additional text.",
            language_label(source)
        )
    }
}

fn language_label(code: &str) -> String {
    match code.trim().to_ascii_lowercase().as_str() {
        "en" => "English".into(),
        "zh" | "zh-cn" | "zh_cn" => "Chinese".into(),
        "ja" => "Japanese".into(),
        "ko" => "Korean".into(),
        other => other.to_string(),
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, TranslationError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| TranslationError::NotConfigured {
            message: format!("failed to build HTTP client: {err}"),
        })
}

fn map_request_error(err: reqwest::Error, timeout: Duration) -> TranslationError {
    if err.is_timeout() {
        TranslationError::timeout(timeout)
    } else {
        TranslationError::Network {
            message: err.to_string(),
        }
    }
}

fn service_error(status: StatusCode, message: Option<String>) -> TranslationError {
    let message = message
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    TranslationError::Service {
        status: status.as_u16().to_string(),
        message,
    }
}

/// Rejects translations that are blank, which would be useless as file names.
fn non_blank(text: String) -> Result<String, TranslationError> {
    if text.trim().is_empty() {
        Err(TranslationError::malformed("translation text is empty"))
    } else {
        Ok(text)
    }
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
