//! Call command - invoke a single tool from the command line.

use super::build_handler;
use crate::config::Settings;
use crate::mcp::params::map_positional;
use crate::mcp::{CallContext, ContentEntry, JsonRpcError, ToolDefinition};
use anyhow::Result;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

const KEY_VALUE_PATTERN: &str = r"^[a-zA-Z_][a-zA-Z0-9_]*=";

/// Run the call command. Exits with status 1 when the tool fails.
pub async fn run_call(
    tool: &str,
    args: &[String],
    data: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    let handler = build_handler(settings)?;

    let arguments = match handler.registry().definition(tool) {
        Some(definition) => parse_arguments(definition, args, data),
        // Let the handler report the unknown tool.
        None => Ok(Map::new()),
    };

    let outcome = match arguments {
        Ok(arguments) => {
            let arguments = Value::Object(arguments);
            debug!("Calling {} with {}", tool, arguments);
            handler
                .call(tool, Some(arguments), &CallContext::default())
                .await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(result) => {
            for entry in &result.content {
                match entry {
                    ContentEntry::Text(text) => println!("{}", text),
                    ContentEntry::File(file) => println!("{}", file.descriptor_json()?),
                }
            }
            Ok(())
        }
        Err(error) => {
            println!("{}", serde_json::to_string_pretty(&failure_json(&error))?);
            std::process::exit(1);
        }
    }
}

/// Build the argument object from `--data`, `key=value` pairs and positional
/// values, in that order of precedence from lowest to highest.
pub(crate) fn parse_arguments(
    definition: &ToolDefinition,
    args: &[String],
    data: Option<&str>,
) -> std::result::Result<Map<String, Value>, JsonRpcError> {
    let mut named = match data {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(JsonRpcError::invalid_params(Some(
                    "--data must be a JSON object",
                )))
            }
            Err(e) => {
                return Err(JsonRpcError::invalid_params(Some(&format!(
                    "--data is not valid JSON: {}",
                    e
                ))))
            }
        },
        None => Map::new(),
    };

    let key_value = Regex::new(KEY_VALUE_PATTERN)
        .map_err(|e| JsonRpcError::internal_error(Some(&e.to_string())))?;

    let mut positional = Vec::new();
    for arg in args {
        if key_value.is_match(arg) {
            if let Some((key, value)) = arg.split_once('=') {
                named.insert(key.to_string(), Value::String(value.to_string()));
                continue;
            }
        }
        positional.push(arg.clone());
    }

    map_positional(definition, &named, &positional)
        .map_err(|e| JsonRpcError::invalid_params(Some(&e.to_string())))
}

fn failure_json(error: &JsonRpcError) -> Value {
    json!({
        "error": true,
        "code": error.code,
        "message": error.message,
    })
}
