//! Downstream integration clients.
//!
//! Every client reports failures as an [`IntegrationError`] whose variant
//! says what went wrong (missing configuration, rejected credentials,
//! unreachable host, upstream failure). The tool-call handler relies on the
//! variant, never on message text, to decide what the caller sees.

pub mod ai;
mod confluence;
mod gitlab;
mod jira;

pub use confluence::ConfluenceClient;
pub use gitlab::GitlabClient;
pub use jira::JiraClient;

use crate::config::Settings;
use crate::error::{Result, ToolgateError};
use ai::{BedrockChat, ChatProvider, DialChat, GeminiChat, OllamaChat, OpenAiChat};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Kind of external system a tool talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationType {
    OpenAi,
    Ollama,
    Gemini,
    Dial,
    Bedrock,
    Jira,
    Confluence,
    Gitlab,
}

impl IntegrationType {
    pub const ALL: [IntegrationType; 8] = [
        IntegrationType::OpenAi,
        IntegrationType::Ollama,
        IntegrationType::Gemini,
        IntegrationType::Dial,
        IntegrationType::Bedrock,
        IntegrationType::Jira,
        IntegrationType::Confluence,
        IntegrationType::Gitlab,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::OpenAi => "openai",
            IntegrationType::Ollama => "ollama",
            IntegrationType::Gemini => "gemini",
            IntegrationType::Dial => "dial",
            IntegrationType::Bedrock => "bedrock",
            IntegrationType::Jira => "jira",
            IntegrationType::Confluence => "confluence",
            IntegrationType::Gitlab => "gitlab",
        }
    }
}

impl std::str::FromStr for IntegrationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        IntegrationType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown integration: {}", s))
    }
}

impl std::fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by an integration client.
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("{integration} is not configured: {detail}")]
    NotConfigured {
        integration: IntegrationType,
        detail: String,
    },

    #[error("{integration} rejected the credentials: {detail}")]
    Unauthorized {
        integration: IntegrationType,
        detail: String,
    },

    #[error("Could not connect to {integration}: {detail}")]
    Connection {
        integration: IntegrationType,
        detail: String,
    },

    #[error("{integration} returned an error: {detail}")]
    Upstream {
        integration: IntegrationType,
        status: Option<u16>,
        detail: String,
    },

    #[error("Unexpected response from {integration}: {detail}")]
    InvalidResponse {
        integration: IntegrationType,
        detail: String,
    },

    /// The caller passed a value the integration refuses to act on.
    #[error("Invalid argument for {integration}: {detail}")]
    InvalidArgument {
        integration: IntegrationType,
        detail: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl IntegrationError {
    pub fn not_configured(integration: IntegrationType, detail: impl Into<String>) -> Self {
        IntegrationError::NotConfigured {
            integration,
            detail: detail.into(),
        }
    }

    pub fn invalid_response(integration: IntegrationType, detail: impl Into<String>) -> Self {
        IntegrationError::InvalidResponse {
            integration,
            detail: detail.into(),
        }
    }

    pub fn invalid_argument(integration: IntegrationType, detail: impl Into<String>) -> Self {
        IntegrationError::InvalidArgument {
            integration,
            detail: detail.into(),
        }
    }

    /// Classify a transport-level failure.
    pub fn from_http(integration: IntegrationType, err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return IntegrationError::Connection {
                integration,
                detail: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return Self::from_status(integration, status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::invalid_response(integration, err.to_string());
        }
        IntegrationError::Other(format!("{} request failed: {}", integration, err))
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(integration: IntegrationType, status: u16, detail: String) -> Self {
        match status {
            401 | 403 => IntegrationError::Unauthorized {
                integration,
                detail: format!("HTTP {}: {}", status, detail),
            },
            _ => IntegrationError::Upstream {
                integration,
                status: Some(status),
                detail: format!("HTTP {}: {}", status, detail),
            },
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            IntegrationError::NotConfigured { .. } => "not_configured",
            IntegrationError::Unauthorized { .. } => "unauthorized",
            IntegrationError::Connection { .. } => "connection",
            IntegrationError::Upstream { .. } => "upstream",
            IntegrationError::InvalidResponse { .. } => "invalid_response",
            IntegrationError::InvalidArgument { .. } => "invalid_argument",
            IntegrationError::Io(_) => "io",
            IntegrationError::Other(_) => "other",
        }
    }

    pub fn integration(&self) -> Option<IntegrationType> {
        match self {
            IntegrationError::NotConfigured { integration, .. }
            | IntegrationError::Unauthorized { integration, .. }
            | IntegrationError::Connection { integration, .. }
            | IntegrationError::Upstream { integration, .. }
            | IntegrationError::InvalidResponse { integration, .. }
            | IntegrationError::InvalidArgument { integration, .. } => Some(*integration),
            IntegrationError::Io(_) | IntegrationError::Other(_) => None,
        }
    }

    /// Whether the caller can fix this by configuring or reaching the
    /// integration, as opposed to a defect on our side or theirs.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            IntegrationError::NotConfigured { .. }
                | IntegrationError::Unauthorized { .. }
                | IntegrationError::Connection { .. }
        )
    }
}

/// Fail with a classified error unless the response is a success.
pub(crate) async fn ensure_success(
    integration: IntegrationType,
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail: String = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body.chars().take(500).collect()
    };
    Err(IntegrationError::from_status(integration, status.as_u16(), detail))
}

/// Append percent-encoded path segments to `base`.
///
/// Each segment is encoded on its own, so a `/` inside one becomes `%2F`.
pub(crate) fn join_segments(
    integration: IntegrationType,
    base: &str,
    segments: &[&str],
) -> std::result::Result<url::Url, IntegrationError> {
    let invalid = |detail: String| IntegrationError::not_configured(integration, detail);
    let mut url = url::Url::parse(base).map_err(|e| invalid(format!("'{}' is not a URL: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("'{}' cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Name the unset variables among `(name, is_set)` pairs.
pub(crate) fn missing_vars(vars: &[(&str, bool)]) -> Option<String> {
    let missing: Vec<&str> = vars
        .iter()
        .filter(|(_, set)| !set)
        .map(|(name, _)| *name)
        .collect();
    (!missing.is_empty()).then(|| format!("{} not set", missing.join(", ")))
}

/// Build the shared HTTP client used by the REST integrations.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ToolgateError::Http)
}

/// Constructed integration clients, injected into the tool catalogue.
pub struct Integrations {
    pub openai: Arc<OpenAiChat>,
    pub ollama: Arc<OllamaChat>,
    pub gemini: Arc<GeminiChat>,
    pub dial: Arc<DialChat>,
    pub bedrock: Arc<BedrockChat>,
    pub jira: Arc<JiraClient>,
    pub confluence: Arc<ConfluenceClient>,
    pub gitlab: Arc<GitlabClient>,
}

impl Integrations {
    /// Build every client from settings.
    ///
    /// Clients with missing credentials are still constructed; they report
    /// `NotConfigured` when a tool first uses them.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.general.request_timeout_secs);
        let http = http_client(timeout)?;

        Ok(Self {
            openai: Arc::new(OpenAiChat::new(&settings.openai, timeout)?),
            ollama: Arc::new(OllamaChat::new(&settings.ollama, http.clone())),
            gemini: Arc::new(GeminiChat::new(&settings.gemini, http.clone())),
            dial: Arc::new(DialChat::new(&settings.dial, http.clone())),
            bedrock: Arc::new(BedrockChat::new(&settings.bedrock, http.clone())),
            jira: Arc::new(JiraClient::new(&settings.jira, http.clone(), settings.temp_dir())),
            confluence: Arc::new(ConfluenceClient::new(&settings.confluence, http.clone())),
            gitlab: Arc::new(GitlabClient::new(&settings.gitlab, http)),
        })
    }

    /// Configuration problems per integration; `None` means ready to use.
    pub fn status(&self) -> Vec<(IntegrationType, Option<String>)> {
        vec![
            (IntegrationType::OpenAi, self.openai.missing_config()),
            (IntegrationType::Ollama, self.ollama.missing_config()),
            (IntegrationType::Gemini, self.gemini.missing_config()),
            (IntegrationType::Dial, self.dial.missing_config()),
            (IntegrationType::Bedrock, self.bedrock.missing_config()),
            (IntegrationType::Jira, self.jira.missing_config()),
            (IntegrationType::Confluence, self.confluence.missing_config()),
            (IntegrationType::Gitlab, self.gitlab.missing_config()),
        ]
    }
}
