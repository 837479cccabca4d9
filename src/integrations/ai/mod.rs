//! Chat completion providers behind the `*_ai_chat` tools.

mod bedrock;
mod dial;
mod gemini;
mod ollama;
mod openai;

pub use bedrock::BedrockChat;
pub use dial::DialChat;
pub use gemini::GeminiChat;
pub use ollama::OllamaChat;
pub use openai::OpenAiChat;

use super::{IntegrationError, IntegrationType};
use async_openai::config::Config;
use async_openai::error::OpenAIError;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

/// A model that answers a single user message.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn integration(&self) -> IntegrationType;

    /// Describe what configuration is missing, if any.
    fn missing_config(&self) -> Option<String>;

    /// Send one user message and return the model's text reply.
    async fn chat(&self, message: &str) -> Result<String, IntegrationError>;

    /// Fail fast with `NotConfigured` before any network call.
    fn ensure_configured(&self) -> Result<(), IntegrationError> {
        match self.missing_config() {
            Some(detail) => Err(IntegrationError::not_configured(self.integration(), detail)),
            None => Ok(()),
        }
    }
}

/// Single-turn chat completion against an OpenAI-compatible backend.
pub(crate) async fn complete<C: Config>(
    integration: IntegrationType,
    client: &Client<C>,
    model: &str,
    message: &str,
) -> Result<String, IntegrationError> {
    let user = ChatCompletionRequestUserMessageArgs::default()
        .content(message)
        .build()
        .map_err(|e| IntegrationError::Other(format!("Failed to build message: {}", e)))?;

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(vec![user.into()])
        .build()
        .map_err(|e| IntegrationError::Other(format!("Failed to build request: {}", e)))?;

    debug!("Sending chat request to {} ({})", integration, model);

    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e| map_openai_error(integration, e))?;

    response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .ok_or_else(|| IntegrationError::invalid_response(integration, "No content in response"))
}

/// Classify an async-openai failure by its variant and structured error code.
pub(crate) fn map_openai_error(integration: IntegrationType, err: OpenAIError) -> IntegrationError {
    match err {
        OpenAIError::Reqwest(e) => IntegrationError::from_http(integration, e),
        OpenAIError::ApiError(api) => {
            let rejected = matches!(
                api.code.as_deref(),
                Some("invalid_api_key") | Some("401") | Some("403")
            );
            if rejected {
                IntegrationError::Unauthorized {
                    integration,
                    detail: api.message,
                }
            } else {
                IntegrationError::Upstream {
                    integration,
                    status: None,
                    detail: api.message,
                }
            }
        }
        OpenAIError::JSONDeserialize(e) => IntegrationError::invalid_response(integration, e.to_string()),
        other => IntegrationError::Other(format!("{} request failed: {}", integration, other)),
    }
}
