//! AWS Bedrock Converse API.
//!
//! Authenticates with a bearer token (Bedrock API key) when one is set,
//! otherwise signs each request with SigV4 using IAM access keys.

use super::ChatProvider;
use crate::config::BedrockSettings;
use crate::integrations::{ensure_success, join_segments, IntegrationError, IntegrationType};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::{debug, instrument};

const SIGNING_SERVICE: &str = "bedrock";

/// Static IAM credentials.
struct IamKeys {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

enum Auth {
    Bearer(String),
    SigV4(IamKeys),
    Missing,
}

pub struct BedrockChat {
    http: reqwest::Client,
    auth: Auth,
    region: String,
    base_url: Option<String>,
    model_id: String,
    max_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    messages: Vec<Message<'a>>,
    inference_config: InferenceConfig,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<TextBlock<'a>>,
}

#[derive(Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ConverseResponse {
    output: Option<ConverseOutput>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: Option<OutputMessage>,
}

#[derive(Debug, Deserialize)]
struct OutputMessage {
    #[serde(default)]
    content: Vec<OutputBlock>,
}

#[derive(Debug, Deserialize)]
struct OutputBlock {
    text: Option<String>,
}

impl ConverseResponse {
    fn text(&self) -> Option<String> {
        let message = self.output.as_ref()?.message.as_ref()?;
        let text: String = message
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

impl BedrockChat {
    pub fn new(settings: &BedrockSettings, http: reqwest::Client) -> Self {
        let auth = match (&settings.api_key, &settings.access_key_id, &settings.secret_access_key) {
            (Some(token), _, _) => Auth::Bearer(token.clone()),
            (None, Some(access_key_id), Some(secret_access_key)) => Auth::SigV4(IamKeys {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                session_token: settings.session_token.clone(),
            }),
            _ => Auth::Missing,
        };

        Self {
            http,
            auth,
            region: settings.region.trim().to_string(),
            base_url: settings.base_url.clone(),
            model_id: settings.model_id.clone(),
            max_tokens: settings.max_tokens,
        }
    }

    fn endpoint(&self) -> Result<String, IntegrationError> {
        let base = match &self.base_url {
            Some(url) => url.clone(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        };
        // Inference profile ARNs carry '/', which must stay inside one segment.
        let url = join_segments(
            IntegrationType::Bedrock,
            &base,
            &["model", &self.model_id, "converse"],
        )?;
        Ok(url.into())
    }

    /// SigV4 headers for a JSON POST of `body` to `url`.
    fn sign(&self, keys: &IamKeys, url: &str, body: &[u8]) -> Result<Vec<(String, String)>, IntegrationError> {
        let headers = [("content-type", "application/json")];
        let signable = SignableRequest::new(
            "POST",
            url,
            headers.iter().map(|(k, v)| (*k, *v)),
            SignableBody::Bytes(body),
        )
        .map_err(signing_failed)?;

        let credentials = Credentials::new(
            &keys.access_key_id,
            &keys.secret_access_key,
            keys.session_token.clone(),
            None,
            "toolgate",
        );
        let identity = &credentials.into();
        let v4_params = v4::SigningParams::builder()
            .identity(identity)
            .region(&self.region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(signing_failed)?;
        let params = aws_sigv4::http_request::SigningParams::from(v4_params);

        let output = aws_sigv4::http_request::sign(signable, &params).map_err(signing_failed)?;
        Ok(output
            .output()
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

fn signing_failed(e: impl std::fmt::Display) -> IntegrationError {
    IntegrationError::Other(format!("SigV4 signing failed: {}", e))
}

#[async_trait]
impl ChatProvider for BedrockChat {
    fn integration(&self) -> IntegrationType {
        IntegrationType::Bedrock
    }

    fn missing_config(&self) -> Option<String> {
        if let Auth::Missing = self.auth {
            Some(
                "no credentials found, set BEDROCK_BEARER_TOKEN or BEDROCK_ACCESS_KEY_ID and BEDROCK_SECRET_ACCESS_KEY"
                    .to_string(),
            )
        } else if self.region.is_empty() {
            Some("BEDROCK_REGION is empty".to_string())
        } else {
            None
        }
    }

    #[instrument(skip(self, message), fields(model = %self.model_id))]
    async fn chat(&self, message: &str) -> Result<String, IntegrationError> {
        self.ensure_configured()?;

        let body = ConverseRequest {
            messages: vec![Message {
                role: "user",
                content: vec![TextBlock { text: message }],
            }],
            inference_config: InferenceConfig {
                max_tokens: self.max_tokens,
            },
        };

        let body = serde_json::to_vec(&body)
            .map_err(|e| IntegrationError::Other(format!("Failed to encode request: {}", e)))?;
        let url = self.endpoint()?;
        debug!("POST {}", url);

        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        match &self.auth {
            Auth::Bearer(token) => request = request.bearer_auth(token),
            Auth::SigV4(keys) => {
                for (name, value) in self.sign(keys, &url, &body)? {
                    request = request.header(name, value);
                }
            }
            Auth::Missing => {}
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| IntegrationError::from_http(self.integration(), e))?;

        let parsed: ConverseResponse = ensure_success(self.integration(), response)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::from_http(self.integration(), e))?;

        parsed
            .text()
            .ok_or_else(|| IntegrationError::invalid_response(self.integration(), "No text in converse output"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_credentials() {
        let chat = BedrockChat::new(&BedrockSettings::default(), reqwest::Client::new());
        let err = chat.chat("Hello").await.unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert!(err.to_string().contains("credentials"));
    }

    fn iam_settings(session_token: Option<&str>) -> BedrockSettings {
        BedrockSettings {
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
            session_token: session_token.map(str::to_string),
            ..BedrockSettings::default()
        }
    }

    #[test]
    fn test_endpoint_encodes_model_id() {
        let chat = BedrockChat::new(&BedrockSettings::default(), reqwest::Client::new());
        assert_eq!(
            chat.endpoint().unwrap(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-5-sonnet-20240620-v1:0/converse"
        );

        let profile = BedrockChat::new(
            &BedrockSettings {
                model_id: "arn:aws:bedrock:us-east-1:123456789012:inference-profile/us.anthropic.claude".to_string(),
                base_url: Some("http://localhost:4566/".to_string()),
                ..BedrockSettings::default()
            },
            reqwest::Client::new(),
        );
        assert_eq!(
            profile.endpoint().unwrap(),
            "http://localhost:4566/model/arn:aws:bedrock:us-east-1:123456789012:inference-profile%2Fus.anthropic.claude/converse"
        );
    }

    #[test]
    fn test_bearer_token_wins_over_iam_keys() {
        let settings = BedrockSettings {
            api_key: Some("bedrock-key".to_string()),
            ..iam_settings(None)
        };
        let chat = BedrockChat::new(&settings, reqwest::Client::new());
        assert!(matches!(chat.auth, Auth::Bearer(ref t) if t == "bedrock-key"));
        assert!(chat.missing_config().is_none());

        let chat = BedrockChat::new(&iam_settings(None), reqwest::Client::new());
        assert!(matches!(chat.auth, Auth::SigV4(_)));
        assert!(chat.missing_config().is_none());
    }

    #[test]
    fn test_access_key_without_secret_is_not_configured() {
        let settings = BedrockSettings {
            secret_access_key: None,
            ..iam_settings(None)
        };
        let chat = BedrockChat::new(&settings, reqwest::Client::new());
        assert!(chat.missing_config().unwrap().contains("BEDROCK_SECRET_ACCESS_KEY"));
    }

    #[test]
    fn test_sigv4_headers() {
        let chat = BedrockChat::new(&iam_settings(None), reqwest::Client::new());
        let Auth::SigV4(keys) = &chat.auth else {
            panic!("expected IAM keys");
        };
        let url = chat.endpoint().unwrap();
        let headers = chat.sign(keys, &url, br#"{"messages":[]}"#).unwrap();

        let auth = headers
            .iter()
            .find(|(name, _)| name == "authorization")
            .map(|(_, value)| value.as_str())
            .unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256"));
        assert!(auth.contains("AKIDEXAMPLE/"));
        assert!(auth.contains("/us-east-1/bedrock/aws4_request"));
        assert!(headers.iter().any(|(name, _)| name == "x-amz-date"));
        assert!(!headers.iter().any(|(name, _)| name == "x-amz-security-token"));
    }

    #[test]
    fn test_sigv4_session_token() {
        let chat = BedrockChat::new(&iam_settings(Some("FwoGZXIvYXdzEXAMPLE")), reqwest::Client::new());
        let Auth::SigV4(keys) = &chat.auth else {
            panic!("expected IAM keys");
        };
        let headers = chat.sign(keys, &chat.endpoint().unwrap(), b"{}").unwrap();
        assert!(headers
            .iter()
            .any(|(name, value)| name == "x-amz-security-token" && value == "FwoGZXIvYXdzEXAMPLE"));
    }

    #[test]
    fn test_converse_output_text() {
        let parsed: ConverseResponse = serde_json::from_str(
            r#"{"output":{"message":{"role":"assistant","content":[{"text":"Hi there"}]}},"stopReason":"end_turn"}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Hi there"));
    }
}
