//! Confluence tools.

use crate::error::Result;
use crate::integrations::{ConfluenceClient, IntegrationType};
use crate::mcp::{DeclaredType, ParameterDefinition as P, ToolDefinition, ToolOutput, ToolRegistry};
use serde::Deserialize;
use std::sync::Arc;

const CONFLUENCE: IntegrationType = IntegrationType::Confluence;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentArgs {
    content_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePageArgs {
    title: String,
    parent_id: String,
    body: String,
    space: Option<String>,
}

pub(super) fn register(registry: &mut ToolRegistry, confluence: Arc<ConfluenceClient>) -> Result<()> {
    let client = Arc::clone(&confluence);
    registry.register(
        ToolDefinition::new(
            "confluence_content_by_id",
            CONFLUENCE,
            "Get Confluence content (page body, version, space) by id",
        )
        .param(P::required("contentId", DeclaredType::String, "The content id").example("123456")),
        move |args: ContentArgs| {
            let client = Arc::clone(&client);
            async move { client.content_by_id(&args.content_id).await.map(ToolOutput::Json) }
        },
    )?;

    let client = Arc::clone(&confluence);
    registry.register(
        ToolDefinition::new(
            "confluence_search_content_by_text",
            CONFLUENCE,
            "Full-text search of Confluence content",
        )
        .param(P::required("query", DeclaredType::String, "Text to search for").example("release notes"))
        .param(P::optional("limit", DeclaredType::Integer, "Maximum number of results (default 10)")),
        move |args: SearchArgs| {
            let client = Arc::clone(&client);
            async move {
                client
                    .search_by_text(&args.query, args.limit)
                    .await
                    .map(ToolOutput::Json)
            }
        },
    )?;

    registry.register(
        ToolDefinition::new("confluence_create_page", CONFLUENCE, "Create a Confluence page")
            .param(P::required("title", DeclaredType::String, "Page title"))
            .param(P::required("parentId", DeclaredType::String, "Id of the parent page"))
            .param(
                P::required("body", DeclaredType::String, "Page body in storage format (XHTML)")
                    .example("<p>Hello</p>"),
            )
            .param(P::optional(
                "space",
                DeclaredType::String,
                "Space key; defaults to the configured space",
            )),
        move |args: CreatePageArgs| {
            let client = Arc::clone(&confluence);
            async move {
                client
                    .create_page(&args.title, &args.parent_id, &args.body, args.space.as_deref())
                    .await
                    .map(ToolOutput::Json)
            }
        },
    )
}
