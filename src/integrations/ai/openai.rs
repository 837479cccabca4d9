//! OpenAI chat completions.

use super::{complete, ChatProvider};
use crate::config::OpenAiSettings;
use crate::error::Result;
use crate::integrations::{IntegrationError, IntegrationType};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

pub struct OpenAiChat {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    configured: bool,
}

impl OpenAiChat {
    pub fn new(settings: &OpenAiSettings, timeout: Duration) -> Result<Self> {
        let mut config = OpenAIConfig::new();
        if let Some(key) = &settings.api_key {
            config = config.with_api_key(key);
        }
        if let Some(base) = &settings.base_url {
            config = config.with_api_base(base.trim_end_matches('/'));
        }

        Ok(Self {
            client: create_client(config, timeout)?,
            model: settings.model.clone(),
            configured: settings.api_key.is_some(),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    fn integration(&self) -> IntegrationType {
        IntegrationType::OpenAi
    }

    fn missing_config(&self) -> Option<String> {
        (!self.configured).then(|| "OPEN_AI_API_KEY is not set".to_string())
    }

    #[instrument(skip(self, message), fields(model = %self.model))]
    async fn chat(&self, message: &str) -> std::result::Result<String, IntegrationError> {
        self.ensure_configured()?;
        complete(self.integration(), &self.client, &self.model, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let chat = OpenAiChat::new(&OpenAiSettings::default(), Duration::from_secs(5)).unwrap();
        let err = chat.chat("hi").await.unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert!(err.to_string().contains("OPEN_AI_API_KEY"));
    }
}
