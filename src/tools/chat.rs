/// Chat Tool
///
/// Thin registration wrapper that validates arguments into a `ChatRequest`
/// and hands off to the Chat Orchestrator.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::context::AppContext;
use crate::core::registry::{ToolFuture, ToolRegistry, ToolSpec};
use crate::orchestrator::{ChatOrchestrator, ChatRequest};
use crate::provider::types::ToolResponse;

pub fn register(registry: &mut ToolRegistry) {
    let spec = ToolSpec {
        name: "chat".to_string(),
        description: "Orchestrate a multi-turn chat completion against the configured LLM provider.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "model": { "type": "string" },
                "messages": { "type": "array" },
                "tools": { "type": "array" },
                "tool_choice": {},
                "metadata": { "type": "object" },
                "parallel_tool_calls": { "type": "boolean" }
            },
            "required": ["model", "messages"]
        }),
        output_schema: None,
    };

    registry.register(
        spec,
        Arc::new(
            |ctx: Arc<AppContext>, arguments: Value, cancelled: CancellationToken| -> ToolFuture {
                Box::pin(async move { run(ctx, arguments, cancelled).await })
            },
        ),
    );
}

async fn run(ctx: Arc<AppContext>, arguments: Value, cancelled: CancellationToken) -> ToolResponse {
    let request = match ChatRequest::from_arguments(&arguments) {
        Ok(r) => r,
        Err(e) => return ToolResponse::error_text(e.to_string()),
    };

    let orchestrator = ChatOrchestrator::new(
        ctx.provider.clone(),
        ctx.poller.clone(),
        ctx.think_client.clone(),
        ctx.settings.max_turns,
        ctx.settings.think_tool_enabled,
        ctx.settings.langsmith_tracing,
        ctx.settings.langsmith_project.clone(),
    );

    orchestrator.run(request, &cancelled).await
}
