//! List command implementation.

use super::build_handler;
use crate::cli::Output;
use crate::config::Settings;
use crate::mcp::ToolDefinition;
use anyhow::Result;

/// Run the list command.
pub fn run_list(filter: Option<&str>, settings: &Settings) -> Result<()> {
    let handler = build_handler(settings)?;
    let registry = handler.registry();

    let tools: Vec<&ToolDefinition> = match filter {
        Some(text) => registry.filter(text),
        None => registry.tools().collect(),
    };

    if tools.is_empty() {
        match filter {
            Some(text) => Output::info(&format!("No tools match '{}'.", text)),
            None => Output::info("No tools registered. Check mcp.integrations in your config."),
        }
        return Ok(());
    }

    Output::header(&format!("Tools ({})", tools.len()));
    println!();
    for tool in &tools {
        Output::tool(&tool.name, tool.integration.as_str(), &tool.description);
        for parameter in &tool.parameters {
            let required = if parameter.required { "required" } else { "optional" };
            Output::kv(
                &format!("    {}", parameter.name),
                &format!("{:?}, {}", parameter.declared_type, required),
            );
        }
    }

    Ok(())
}
