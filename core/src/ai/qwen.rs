use super::{
    build_http_client, map_request_error, non_blank, service_error, ProviderSettings,
    TranslationError, Translator,
};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";

/// DashScope text-generation client.
pub struct QwenTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    timeout: Duration,
}

impl QwenTranslator {
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
impl Translator for QwenTranslator {
    fn name(&self) -> &'static str {
        "Qwen"
    }

    async fn translate(&self, name: &str) -> Result<String, TranslationError> {
        debug!("requesting Qwen translation for '{}'", name);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": {
                    "messages": [
                        {
                            "role": "system",
                            "content": self.system_prompt
                        },
                        {
                            "role": "user",
                            "content": name
                        }
                    ]
                },
                "parameters": {
                    "result_format": "text"
                }
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
struct QwenResponse {
    #[serde(default)]
    output: Option<QwenOutput>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QwenOutput {
    #[serde(default)]
    text: Option<String>,
}

fn parse_response(status: StatusCode, body: &str) -> Result<String, TranslationError> {
    let parsed = serde_json::from_str::<QwenResponse>(body);

    if !status.is_success() {
        let message = parsed.ok().and_then(|response| response.message);
        return Err(service_error(status, message));
    }

    let response = parsed
        .map_err(|err| TranslationError::malformed(format!("failed to parse response: {err}")))?;

    if let Some(code) = response.code.as_deref().map(str::trim) {
        if !code.is_empty() && code != "200" {
            return Err(TranslationError::Service {
                status: code.to_string(),
                message: response.message.unwrap_or_default(),
            });
        }
    }

    let text = response
        .output
        .and_then(|output| output.text)
        .ok_or_else(|| TranslationError::malformed("response has no output.text"))?;

    non_blank(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_text_untouched() {
        let body = r#"{"output":{"text":"cat.png"},"request_id":"abc"}"#;
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), "cat.png");

        let padded = r#"{"output":{"text":" Cat Photo.png"}}"#;
        assert_eq!(
            parse_response(StatusCode::OK, padded).unwrap(),
            " Cat Photo.png"
        );
    }

    #[test]
    fn error_code_in_body_is_service_error() {
        let body = r#"{"code":"InvalidApiKey","message":"Invalid API-key provided."}"#;
        let err = parse_response(StatusCode::OK, body).unwrap_err();
        assert_eq!(
            err,
            TranslationError::Service {
                status: "InvalidApiKey".into(),
                message: "Invalid API-key provided.".into(),
            }
        );
    }

    #[test]
    fn http_failure_uses_body_message() {
        let body = r#"{"code":"Throttling","message":"Requests rate limit exceeded"}"#;
        let err = parse_response(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();
        match err {
            TranslationError::Service { status, message } => {
                assert_eq!(status, "429");
                assert_eq!(message, "Requests rate limit exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn http_failure_without_body_uses_reason() {
        let err = parse_response(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert_eq!(
            err,
            TranslationError::Service {
                status: "502".into(),
                message: "Bad Gateway".into(),
            }
        );
    }

    #[test]
    fn malformed_bodies_are_typed_failures() {
        assert!(matches!(
            parse_response(StatusCode::OK, "not json"),
            Err(TranslationError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_response(StatusCode::OK, r#"{"output":{}}"#),
            Err(TranslationError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_response(StatusCode::OK, r#"{"output":{"text":"  "}}"#),
            Err(TranslationError::MalformedResponse { .. })
        ));
    }
}
