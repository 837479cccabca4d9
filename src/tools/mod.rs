//! The concrete tool catalogue.
//!
//! Each integration module declares its tools (definitions plus typed
//! argument structs) and registers handlers that call the injected client.

mod ai;
mod confluence;
mod gitlab;
mod jira;

use crate::error::Result;
use crate::integrations::{IntegrationType, Integrations};
use crate::mcp::ToolRegistry;
use std::sync::Arc;
use tracing::debug;

/// Build the registry for the enabled integrations, in catalogue order.
pub fn build_registry(
    integrations: &Integrations,
    enabled: &[IntegrationType],
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    for integration in IntegrationType::ALL {
        if !enabled.contains(&integration) {
            continue;
        }
        match integration {
            IntegrationType::OpenAi => ai::register(&mut registry, integrations.openai.clone())?,
            IntegrationType::Ollama => ai::register(&mut registry, integrations.ollama.clone())?,
            IntegrationType::Gemini => ai::register(&mut registry, integrations.gemini.clone())?,
            IntegrationType::Dial => ai::register(&mut registry, integrations.dial.clone())?,
            IntegrationType::Bedrock => ai::register(&mut registry, integrations.bedrock.clone())?,
            IntegrationType::Jira => jira::register(&mut registry, Arc::clone(&integrations.jira))?,
            IntegrationType::Confluence => {
                confluence::register(&mut registry, Arc::clone(&integrations.confluence))?
            }
            IntegrationType::Gitlab => {
                gitlab::register(&mut registry, Arc::clone(&integrations.gitlab))?
            }
        }
    }

    debug!("Registered {} tools", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn integrations() -> Integrations {
        Integrations::from_settings(&Settings::default()).unwrap()
    }

    #[test]
    fn test_full_catalogue() {
        let registry = build_registry(&integrations(), &IntegrationType::ALL).unwrap();
        let names: Vec<&str> = registry.tools().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "openai_ai_chat",
                "ollama_ai_chat",
                "gemini_ai_chat",
                "dial_ai_chat",
                "bedrock_ai_chat",
                "jira_get_ticket",
                "jira_search_by_jql",
                "jira_post_comment",
                "jira_get_comments",
                "jira_update_field",
                "jira_download_attachment",
                "confluence_content_by_id",
                "confluence_search_content_by_text",
                "confluence_create_page",
                "gitlab_get_merge_request",
                "gitlab_list_merge_requests",
            ]
        );
    }

    #[test]
    fn test_only_enabled_integrations() {
        let registry = build_registry(&integrations(), &[IntegrationType::Gitlab]).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry
            .tools()
            .all(|t| t.integration == IntegrationType::Gitlab));

        let registry = build_registry(&integrations(), &[]).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_declared_parameters() {
        let registry = build_registry(&integrations(), &IntegrationType::ALL).unwrap();

        let ticket = registry.definition("jira_get_ticket").unwrap();
        let key = ticket.parameter("key").unwrap();
        assert!(key.required);
        assert_eq!(key.aliases, vec!["ticketKey"]);

        let mr = registry.definition("gitlab_get_merge_request").unwrap();
        assert_eq!(
            mr.parameter("mergeRequestIid").unwrap().declared_type,
            crate::mcp::DeclaredType::Long
        );
    }
}
