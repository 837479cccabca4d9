//! MCP command implementation.

use super::build_handler;
use crate::config::Settings;
use crate::mcp::McpServer;
use anyhow::Result;

/// Run the MCP server on stdio. Nothing but JSON-RPC may reach stdout.
pub async fn run_mcp(settings: Settings) -> Result<()> {
    let handler = build_handler(&settings)?;
    let server = McpServer::new(handler, &settings.mcp.protocol_version);
    server.run().await
}
