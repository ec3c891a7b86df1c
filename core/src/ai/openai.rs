use super::{
    build_http_client, map_request_error, non_blank, service_error, ProviderSettings,
    TranslationError, Translator,
};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// DashScope's OpenAI-compatible endpoint; any chat-completions server works.
pub const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

pub struct OpenAiCompatibleTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    timeout: Duration,
}

impl OpenAiCompatibleTranslator {
    pub fn new(settings: ProviderSettings) -> Result<Self, TranslationError> {
        let api_key = settings.require_api_key()?;
        Ok(Self {
            client: build_http_client(settings.timeout)?,
            endpoint: settings.endpoint,
            api_key,
            model: settings.model,
            system_prompt: settings.system_prompt,
            timeout: settings.timeout,
        })
    }
}

#[async_trait]
impl Translator for OpenAiCompatibleTranslator {
    fn name(&self) -> &'static str {
        "OpenAI-compatible"
    }

    async fn translate(&self, name: &str) -> Result<String, TranslationError> {
        debug!("requesting chat-completions translation for '{}'", name);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": self.system_prompt
                    },
                    {
                        "role": "user",
                        "content": name
                    }
                ],
                "temperature": 0.0
            }))
            .send()
            .await
            .map_err(|err| map_request_error(err, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| map_request_error(err, self.timeout))?;

        parse_response(status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Option<Vec<ChatChoice>>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    #[serde(default)]
    message: Option<String>,
}

fn parse_response(status: StatusCode, body: &str) -> Result<String, TranslationError> {
    let parsed = serde_json::from_str::<ChatCompletion>(body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .and_then(|completion| completion.error)
            .and_then(|error| error.message);
        return Err(service_error(status, message));
    }

    let completion = parsed
        .map_err(|err| TranslationError::malformed(format!("failed to parse response: {err}")))?;

    if let Some(error) = completion.error {
        return Err(TranslationError::Service {
            status: status.as_u16().to_string(),
            message: error.message.unwrap_or_default(),
        });
    }

    let content = completion
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| TranslationError::malformed("response has no choices[0].message.content"))?;

    non_blank(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"dog.png"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), "dog.png");
    }

    #[test]
    fn empty_choices_is_malformed() {
        assert!(matches!(
            parse_response(StatusCode::OK, r#"{"choices":[]}"#),
            Err(TranslationError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn error_payload_is_service_error() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        let err = parse_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert_eq!(
            err,
            TranslationError::Service {
                status: "401".into(),
                message: "Incorrect API key provided".into(),
            }
        );
    }
}
