//! Configuration module for Toolgate.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    AtlassianSettings, BedrockSettings, ConfluenceSettings, DialSettings, GeminiSettings,
    GeneralSettings, GitlabSettings, McpSettings, OllamaSettings, OpenAiSettings, ServerSettings,
    Settings,
};
