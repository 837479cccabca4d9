//! GitLab tools.

use crate::error::Result;
use crate::integrations::{GitlabClient, IntegrationType};
use crate::mcp::{DeclaredType, ParameterDefinition as P, ToolDefinition, ToolOutput, ToolRegistry};
use serde::Deserialize;
use std::sync::Arc;

const GITLAB: IntegrationType = IntegrationType::Gitlab;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeRequestArgs {
    project: String,
    merge_request_iid: i64,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    project: String,
    state: Option<String>,
}

fn project() -> P {
    P::required("project", DeclaredType::String, "Project id or full path").example("group/app")
}

pub(super) fn register(registry: &mut ToolRegistry, gitlab: Arc<GitlabClient>) -> Result<()> {
    let client = Arc::clone(&gitlab);
    registry.register(
        ToolDefinition::new("gitlab_get_merge_request", GITLAB, "Get a GitLab merge request")
            .param(project())
            .param(P::required(
                "mergeRequestIid",
                DeclaredType::Long,
                "Merge request IID within the project",
            )),
        move |args: MergeRequestArgs| {
            let client = Arc::clone(&client);
            async move {
                client
                    .get_merge_request(&args.project, args.merge_request_iid)
                    .await
                    .map(ToolOutput::Json)
            }
        },
    )?;

    registry.register(
        ToolDefinition::new(
            "gitlab_list_merge_requests",
            GITLAB,
            "List merge requests of a GitLab project",
        )
        .param(project())
        .param(
            P::optional("state", DeclaredType::String, "opened, merged, closed or all (default opened)")
                .example("opened"),
        ),
        move |args: ListArgs| {
            let client = Arc::clone(&gitlab);
            async move {
                client
                    .list_merge_requests(&args.project, args.state.as_deref())
                    .await
                    .map(ToolOutput::Json)
            }
        },
    )
}
