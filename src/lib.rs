//! Toolgate - MCP tool gateway
//!
//! Exposes issue trackers, wikis, code review and AI model providers as
//! tools callable over the Model Context Protocol (JSON-RPC 2.0).
//!
//! # Overview
//!
//! Toolgate allows you to:
//! - Serve a catalogue of tools over stdio or HTTP for AI assistants
//! - Call the same tools directly from the command line
//! - Hand files produced by tools to clients through short-lived download links
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `integrations` - Clients for Jira, Confluence, GitLab and the AI providers
//! - `tools` - The tool catalogue, wiring integrations into the registry
//! - `mcp` - Registry, argument binding, dispatch and the JSON-RPC server
//! - `files` - Token registry for downloadable files
//! - `cli` - Command line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolgate::config::Settings;
//! use toolgate::integrations::Integrations;
//! use toolgate::mcp::{CallContext, ToolCallHandler};
//! use toolgate::tools::build_registry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let integrations = Integrations::from_settings(&settings)?;
//!     let registry = build_registry(&integrations, &settings.mcp.integrations)?;
//!     let handler = ToolCallHandler::new(Arc::new(registry));
//!
//!     let args = serde_json::json!({ "key": "DEMO-1" });
//!     let result = handler
//!         .call("jira_get_comments", Some(args), &CallContext::default())
//!         .await;
//!     println!("{:?}", result);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod integrations;
pub mod mcp;
pub mod openai;
pub mod tools;

pub use error::{Result, ToolgateError};
