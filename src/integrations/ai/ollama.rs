//! Ollama, through its OpenAI-compatible `/v1` endpoint.

use super::{complete, ChatProvider};
use crate::config::OllamaSettings;
use crate::integrations::{IntegrationError, IntegrationType};
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use tracing::instrument;

pub struct OllamaChat {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    base_url: String,
}

impl OllamaChat {
    pub fn new(settings: &OllamaSettings, http: reqwest::Client) -> Self {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        // Ollama ignores the key but the client always sends one.
        let config = OpenAIConfig::new()
            .with_api_base(format!("{}/v1", base_url))
            .with_api_key("ollama");

        Self {
            client: async_openai::Client::with_config(config).with_http_client(http),
            model: settings.model.clone(),
            base_url,
        }
    }
}

#[async_trait]
impl ChatProvider for OllamaChat {
    fn integration(&self) -> IntegrationType {
        IntegrationType::Ollama
    }

    fn missing_config(&self) -> Option<String> {
        if self.base_url.is_empty() {
            Some("OLLAMA_BASE_PATH is empty".to_string())
        } else if self.model.trim().is_empty() {
            Some("OLLAMA_MODEL is empty".to_string())
        } else {
            None
        }
    }

    #[instrument(skip(self, message), fields(model = %self.model))]
    async fn chat(&self, message: &str) -> Result<String, IntegrationError> {
        self.ensure_configured()?;
        complete(self.integration(), &self.client, &self.model, message).await
    }
}
