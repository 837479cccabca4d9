//! EPAM Dial, which speaks the Azure OpenAI deployment API.

use super::{complete, ChatProvider};
use crate::config::DialSettings;
use crate::integrations::{IntegrationError, IntegrationType};
use async_openai::config::AzureConfig;
use async_trait::async_trait;
use tracing::instrument;

pub struct DialChat {
    client: Option<async_openai::Client<AzureConfig>>,
    model: String,
    has_key: bool,
}

impl DialChat {
    pub fn new(settings: &DialSettings, http: reqwest::Client) -> Self {
        let client = match (&settings.api_key, &settings.base_url) {
            (Some(key), Some(base)) => {
                let config = AzureConfig::new()
                    .with_api_base(base.trim_end_matches('/'))
                    .with_api_key(key)
                    .with_deployment_id(&settings.model)
                    .with_api_version(&settings.api_version);
                Some(async_openai::Client::with_config(config).with_http_client(http))
            }
            _ => None,
        };

        Self {
            client,
            model: settings.model.clone(),
            has_key: settings.api_key.is_some(),
        }
    }
}

#[async_trait]
impl ChatProvider for DialChat {
    fn integration(&self) -> IntegrationType {
        IntegrationType::Dial
    }

    fn missing_config(&self) -> Option<String> {
        match (&self.client, self.has_key) {
            (Some(_), _) => None,
            (None, false) => Some("DIAL_AI_API_KEY is not set".to_string()),
            (None, true) => Some("DIAL_AI_BATH_PATH is not set".to_string()),
        }
    }

    #[instrument(skip(self, message), fields(model = %self.model))]
    async fn chat(&self, message: &str) -> Result<String, IntegrationError> {
        self.ensure_configured()?;
        let Some(client) = &self.client else {
            return Err(IntegrationError::not_configured(self.integration(), "client unavailable"));
        };
        complete(self.integration(), client, &self.model, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_key_without_base_path() {
        let settings = DialSettings {
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let chat = DialChat::new(&settings, reqwest::Client::new());
        let err = chat.chat("hello").await.unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert!(err.to_string().contains("DIAL_AI_BATH_PATH"));
    }
}
