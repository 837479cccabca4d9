//! Configuration settings for Toolgate.

use crate::integrations::IntegrationType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub mcp: McpSettings,
    pub openai: OpenAiSettings,
    pub ollama: OllamaSettings,
    pub gemini: GeminiSettings,
    pub dial: DialSettings,
    pub bedrock: BedrockSettings,
    pub jira: AtlassianSettings,
    pub confluence: ConfluenceSettings,
    pub gitlab: GitlabSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (downloaded attachments, generated files).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Timeout for outbound integration requests, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.toolgate".to_string(),
            temp_dir: "/tmp/toolgate".to_string(),
            log_level: "info".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL used in download links.
    /// When unset, the HTTP transport derives it from the request's Host header.
    pub public_url: Option<String>,
    /// Lifetime of a download token, in minutes.
    pub file_ttl_minutes: u64,
    /// Delay before a downloaded file is removed from disk, in seconds.
    pub delete_after_download_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_url: None,
            file_ttl_minutes: 15,
            delete_after_download_secs: 30,
        }
    }
}

impl ServerSettings {
    /// Base URL for download links when no request context is available.
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// MCP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Integrations whose tools are exposed.
    pub integrations: Vec<IntegrationType>,
    /// Protocol version reported when the client does not send one.
    pub protocol_version: String,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            integrations: IntegrationType::ALL.to_vec(),
            protocol_version: "2024-11-05".to_string(),
        }
    }
}

/// OpenAI chat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Ollama settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
        }
    }
}

/// Google Gemini settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

/// EPAM Dial (Azure OpenAI compatible) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub api_version: String,
}

impl Default for DialSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o".to_string(),
            api_version: "2024-02-01".to_string(),
        }
    }
}

/// AWS Bedrock settings.
///
/// A bearer token (`api_key`) wins over IAM keys; IAM keys are signed with SigV4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockSettings {
    pub api_key: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Endpoint override; defaults to the regional bedrock-runtime host.
    pub base_url: Option<String>,
    pub region: String,
    pub model_id: String,
    pub max_tokens: u32,
}

impl Default for BedrockSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            base_url: None,
            region: "us-east-1".to_string(),
            model_id: "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string(),
            max_tokens: 4096,
        }
    }
}

/// Jira connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AtlassianSettings {
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
}

/// Confluence connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfluenceSettings {
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    /// Space used when a tool call does not name one.
    pub default_space: Option<String>,
}

/// GitLab connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitlabSettings {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for GitlabSettings {
    fn default() -> Self {
        Self {
            base_url: "https://gitlab.com".to_string(),
            token: None,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables override secrets and endpoints found in the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay values from the environment.
    ///
    /// Takes a lookup function so tests can supply a fixed environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // The first name is the canonical one; later names are accepted aliases.
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(k));

        if let Some(v) = first(&["OPEN_AI_API_KEY", "OPENAI_API_KEY"]) {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = first(&["OPEN_AI_BATH_PATH", "OPENAI_BASE_PATH"]) {
            self.openai.base_url = Some(v);
        }
        if let Some(v) = first(&["OPEN_AI_MODEL", "OPENAI_MODEL"]) {
            self.openai.model = v;
        }
        if let Some(v) = get("OLLAMA_BASE_PATH") {
            self.ollama.base_url = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.ollama.model = v;
        }
        if let Some(v) = get("GEMINI_API_KEY") {
            self.gemini.api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_BASE_PATH") {
            self.gemini.base_url = v;
        }
        if let Some(v) = get("GEMINI_DEFAULT_MODEL") {
            self.gemini.model = v;
        }
        if let Some(v) = first(&["DIAL_AI_API_KEY", "DIAL_API_KEY"]) {
            self.dial.api_key = Some(v);
        }
        if let Some(v) = first(&["DIAL_AI_BATH_PATH", "DIAL_BATH_PATH", "DIAL_BASE_PATH"]) {
            self.dial.base_url = Some(v);
        }
        if let Some(v) = first(&["DIAL_AI_MODEL", "DIAL_MODEL"]) {
            self.dial.model = v;
        }
        if let Some(v) = first(&["BEDROCK_BEARER_TOKEN", "AWS_BEARER_TOKEN_BEDROCK"]) {
            self.bedrock.api_key = Some(v);
        }
        if let Some(v) = first(&["BEDROCK_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID"]) {
            self.bedrock.access_key_id = Some(v);
        }
        if let Some(v) = first(&["BEDROCK_SECRET_ACCESS_KEY", "AWS_SECRET_ACCESS_KEY"]) {
            self.bedrock.secret_access_key = Some(v);
        }
        if let Some(v) = first(&["BEDROCK_SESSION_TOKEN", "AWS_SESSION_TOKEN"]) {
            self.bedrock.session_token = Some(v);
        }
        if let Some(v) = get("BEDROCK_BASE_PATH") {
            self.bedrock.base_url = Some(v);
        }
        if let Some(v) = first(&["BEDROCK_REGION", "AWS_REGION"]) {
            self.bedrock.region = v;
        }
        if let Some(v) = get("BEDROCK_MODEL_ID") {
            self.bedrock.model_id = v;
        }
        if let Some(v) = get("BEDROCK_MAX_TOKENS").and_then(|v| v.trim().parse().ok()) {
            self.bedrock.max_tokens = v;
        }
        if let Some(v) = get("JIRA_BASE_PATH") {
            self.jira.base_url = Some(v);
        }
        if let Some(v) = get("JIRA_EMAIL") {
            self.jira.email = Some(v);
        }
        if let Some(v) = get("JIRA_API_TOKEN") {
            self.jira.api_token = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_BASE_PATH") {
            self.confluence.base_url = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_EMAIL") {
            self.confluence.email = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_API_TOKEN") {
            self.confluence.api_token = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_DEFAULT_SPACE") {
            self.confluence.default_space = Some(v);
        }
        if let Some(v) = get("GITLAB_BASE_PATH") {
            self.gitlab.base_url = v;
        }
        if let Some(v) = get("GITLAB_TOKEN") {
            self.gitlab.token = Some(v);
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ToolgateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("toolgate")
            .join("config.toml")
    }

    /// The `--config` path if given, else the default location.
    pub fn resolve_config_path(config: Option<&str>) -> PathBuf {
        match config {
            Some(path) => Self::expand_path(path),
            None => Self::default_config_path(),
        }
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}
