//! Jira tools.

use crate::error::Result;
use crate::integrations::{IntegrationType, JiraClient};
use crate::mcp::{DeclaredType, ParameterDefinition as P, ToolDefinition, ToolOutput, ToolRegistry};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const JIRA: IntegrationType = IntegrationType::Jira;

#[derive(Debug, Deserialize)]
struct TicketArgs {
    key: String,
    #[serde(default)]
    fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    jql: String,
    #[serde(default)]
    fields: Vec<String>,
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CommentArgs {
    key: String,
    comment: String,
}

#[derive(Debug, Deserialize)]
struct KeyArgs {
    key: String,
}

#[derive(Debug, Deserialize)]
struct UpdateFieldArgs {
    key: String,
    field: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct AttachmentArgs {
    href: String,
}

fn ticket_key(description: &str) -> P {
    P::required("key", DeclaredType::String, description)
        .alias("ticketKey")
        .example("DEMO-123")
}

pub(super) fn register(registry: &mut ToolRegistry, jira: Arc<JiraClient>) -> Result<()> {
    let client = Arc::clone(&jira);
    registry.register(
        ToolDefinition::new("jira_get_ticket", JIRA, "Get a Jira ticket by key")
            .param(ticket_key("The Jira ticket key to retrieve"))
            .param(
                P::optional("fields", DeclaredType::StringArray, "Fields to include in the response")
                    .example("[\"summary\", \"status\", \"assignee\"]"),
            ),
        move |args: TicketArgs| {
            let client = Arc::clone(&client);
            async move {
                client
                    .get_ticket(&args.key, &args.fields)
                    .await
                    .map(ToolOutput::Json)
            }
        },
    )?;

    let client = Arc::clone(&jira);
    registry.register(
        ToolDefinition::new(
            "jira_search_by_jql",
            JIRA,
            "Search for Jira tickets using JQL and return all results",
        )
        .param(
            P::required("jql", DeclaredType::String, "JQL query string")
                .alias("searchQueryJQL")
                .example("project = DEMO AND status = Open"),
        )
        .param(
            P::optional("fields", DeclaredType::StringArray, "Fields to include for each ticket")
                .example("[\"summary\", \"status\"]"),
        )
        .param(P::optional(
            "maxResults",
            DeclaredType::Integer,
            "Maximum number of tickets to return (default 1000)",
        )),
        move |args: SearchArgs| {
            let client = Arc::clone(&client);
            async move {
                client
                    .search(&args.jql, &args.fields, args.max_results)
                    .await
                    .map(|issues| ToolOutput::Json(Value::Array(issues)))
            }
        },
    )?;

    let client = Arc::clone(&jira);
    registry.register(
        ToolDefinition::new("jira_post_comment", JIRA, "Post a comment to a Jira ticket")
            .param(ticket_key("The Jira ticket key to comment on"))
            .param(
                P::required(
                    "comment",
                    DeclaredType::String,
                    "Comment text (Jira markup: h2. headings, *bold*, {code}code{code}, * lists)",
                )
                .example("h2. Status\n*Done* with the review"),
            ),
        move |args: CommentArgs| {
            let client = Arc::clone(&client);
            async move {
                client
                    .post_comment(&args.key, &args.comment)
                    .await
                    .map(|()| ToolOutput::Text(format!("Comment posted to {}", args.key)))
            }
        },
    )?;

    let client = Arc::clone(&jira);
    registry.register(
        ToolDefinition::new("jira_get_comments", JIRA, "Get all comments of a Jira ticket")
            .param(ticket_key("The Jira ticket key to get comments for")),
        move |args: KeyArgs| {
            let client = Arc::clone(&client);
            async move { client.get_comments(&args.key).await.map(ToolOutput::Json) }
        },
    )?;

    let client = Arc::clone(&jira);
    registry.register(
        ToolDefinition::new(
            "jira_update_field",
            JIRA,
            "Update a field of a Jira ticket. A field name updates every field with that name",
        )
        .param(P::required("key", DeclaredType::String, "The Jira ticket key to update").example("DEMO-123"))
        .param(
            P::required(
                "field",
                DeclaredType::String,
                "Field name (e.g. 'Dependencies') or custom field id (e.g. 'customfield_10091')",
            )
            .example("customfield_10091"),
        )
        .param(P::required("value", DeclaredType::Any, "The new value for the field")),
        move |args: UpdateFieldArgs| {
            let client = Arc::clone(&client);
            async move {
                client
                    .update_field(&args.key, &args.field, args.value)
                    .await
                    .map(ToolOutput::Json)
            }
        },
    )?;

    registry.register(
        ToolDefinition::new(
            "jira_download_attachment",
            JIRA,
            "Download a Jira attachment and return a temporary download link",
        )
        .param(
            P::required("href", DeclaredType::String, "The attachment URL to download")
                .example("https://acme.atlassian.net/secure/attachment/10001/screen.png"),
        ),
        move |args: AttachmentArgs| {
            let client = Arc::clone(&jira);
            async move {
                client
                    .download_attachment(&args.href)
                    .await
                    .map(ToolOutput::File)
            }
        },
    )
}
