//! `<provider>_ai_chat` tools.

use crate::error::Result;
use crate::integrations::ai::ChatProvider;
use crate::integrations::IntegrationType;
use crate::mcp::{DeclaredType, ParameterDefinition, ToolDefinition, ToolOutput, ToolRegistry};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ChatArgs {
    message: String,
}

fn provider_label(integration: IntegrationType) -> &'static str {
    match integration {
        IntegrationType::OpenAi => "OpenAI",
        IntegrationType::Ollama => "a local Ollama model",
        IntegrationType::Gemini => "Google Gemini",
        IntegrationType::Dial => "EPAM Dial",
        IntegrationType::Bedrock => "AWS Bedrock",
        other => other.as_str(),
    }
}

pub(super) fn register<P>(registry: &mut ToolRegistry, provider: Arc<P>) -> Result<()>
where
    P: ChatProvider + 'static,
{
    let integration = provider.integration();
    let definition = ToolDefinition::new(
        &format!("{}_ai_chat", integration),
        integration,
        &format!(
            "Send a text message to {} and return the model's reply",
            provider_label(integration)
        ),
    )
    .param(
        ParameterDefinition::required("message", DeclaredType::String, "Text message to send")
            .example("Summarize the open risks in three bullet points"),
    );

    registry.register(definition, move |args: ChatArgs| {
        let provider = Arc::clone(&provider);
        async move { provider.chat(&args.message).await.map(ToolOutput::Text) }
    })
}
