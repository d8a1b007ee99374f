//! Chat-completions client for the reasoning model endpoint.
//!
//! All three pipeline stages talk to one OpenAI-compatible endpoint,
//! differing only in model name and prompt. Self-hosted gateways work by
//! pointing `LLM_BASE_URL` at them; the API key header is only sent when
//! configured.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RcaError, RcaResult};

/// Default chat-completions endpoint base URL
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the model endpoint client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Optional bearer API key
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
            api_key: std::env::var("LLM_API_KEY").ok(),
            timeout_secs: 120,
        }
    }
}

/// Chat API request message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat API response format selector
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat API request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Chat API response choice message
#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat API response choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

/// Chat API response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Chat API error
#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
}

/// Chat API error response
#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

/// Client for the OpenAI-compatible chat-completions API.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: LlmConfig) -> RcaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Run one chat completion and return the generated text.
    ///
    /// # Errors
    /// Returns an error if the request fails, the API reports an error, or
    /// the response carries no content.
    pub async fn chat(
        &self,
        model: &str,
        system: Option<&str>,
        user: &str,
        json_mode: bool,
    ) -> RcaResult<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user.to_string(),
        });

        let request = ChatRequest {
            model: model.to_string(),
            messages,
            response_format: json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        debug!(model = %model, json_mode, "Calling model endpoint");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);
            return Err(RcaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RcaError::ModelOutput("model returned no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LlmClient {
        LlmClient::new(LlmConfig {
            base_url: server.uri(),
            api_key: None,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_chat_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": "detector"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "OOM_KILLED"}}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let text = client
            .chat("detector", Some("classify"), "context", false)
            .await
            .unwrap();
        assert_eq!(text, "OOM_KILLED");
    }

    #[tokio::test]
    async fn test_chat_empty_choices_is_model_output_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.chat("detector", None, "context", false).await.unwrap_err();
        assert!(matches!(err, RcaError::ModelOutput(_)));
    }

    #[tokio::test]
    async fn test_chat_api_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "rate limited", "type": "rate_limit"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.chat("detector", None, "context", false).await.unwrap_err();
        match err {
            RcaError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
