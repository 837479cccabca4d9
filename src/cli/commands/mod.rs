//! CLI command implementations.

mod call;
mod config;
mod doctor;
mod list;
mod mcp;
mod serve;

pub use call::run_call;
pub use config::run_config;
pub use doctor::run_doctor;
pub use list::run_list;
pub use mcp::run_mcp;
pub use serve::run_serve;

use crate::config::Settings;
use crate::integrations::Integrations;
use crate::mcp::ToolCallHandler;
use crate::tools::build_registry;
use std::sync::Arc;

/// Wire settings into a ready-to-use tool call handler.
pub(crate) fn build_handler(settings: &Settings) -> anyhow::Result<ToolCallHandler> {
    let integrations = Integrations::from_settings(settings)?;
    let registry = build_registry(&integrations, &settings.mcp.integrations)?;
    Ok(ToolCallHandler::new(Arc::new(registry)))
}
