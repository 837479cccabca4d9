//! Google Gemini `generateContent`.

use super::ChatProvider;
use crate::config::GeminiSettings;
use crate::integrations::{ensure_success, IntegrationError, IntegrationType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub struct GeminiChat {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

impl GeminiChat {
    pub fn new(settings: &GeminiSettings, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatProvider for GeminiChat {
    fn integration(&self) -> IntegrationType {
        IntegrationType::Gemini
    }

    fn missing_config(&self) -> Option<String> {
        self.api_key
            .is_none()
            .then(|| "GEMINI_API_KEY is not set".to_string())
    }

    #[instrument(skip(self, message), fields(model = %self.model))]
    async fn chat(&self, message: &str) -> Result<String, IntegrationError> {
        self.ensure_configured()?;
        let key = self.api_key.as_deref().unwrap_or_default();

        let body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: message }],
            }],
        };

        debug!("POST {}", self.endpoint());
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| IntegrationError::from_http(self.integration(), e))?;

        let parsed: GenerateResponse = ensure_success(self.integration(), response)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::from_http(self.integration(), e))?;

        parsed
            .text()
            .ok_or_else(|| IntegrationError::invalid_response(self.integration(), "No candidates in response"))
    }
}
