/// Echo Tool
///
/// Echoes the `text` argument back as a single text content block.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::context::AppContext;
use crate::core::registry::{ToolFuture, ToolRegistry, ToolSpec};
use crate::provider::types::{ContentBlock, ToolResponse};

pub fn register(registry: &mut ToolRegistry) {
    let spec = ToolSpec {
        name: "echo".to_string(),
        description: "Echo a message back to the client.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "The text to echo" }
            },
            "required": ["text"]
        }),
        output_schema: None,
    };

    registry.register(
        spec,
        Arc::new(
            |_ctx: Arc<AppContext>, arguments: Value, _cancelled: CancellationToken| -> ToolFuture {
                Box::pin(async move {
                    match arguments.get("text").and_then(|v| v.as_str()) {
                        Some(text) => ToolResponse::ok(vec![ContentBlock::text_block(text)], Vec::new()),
                        None => ToolResponse::error_text("echo: \"text\" is required and must be a string"),
                    }
                })
            },
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::core::session::SessionRegistry;
    use crate::provider::adapter::HttpProviderAdapter;
    use crate::provider::poller::ResponsePoller;

    fn test_context() -> Arc<AppContext> {
        let settings = Settings::for_tests();
        Arc::new(AppContext {
            sessions: SessionRegistry::new(settings.require_session),
            provider: Arc::new(HttpProviderAdapter::new("test-key".to_string(), settings.openai_base_url.clone())),
            poller: Arc::new(ResponsePoller::new(
                Arc::new(tokio::sync::Semaphore::new(settings.max_poll_concurrency)),
                std::time::Duration::from_millis(0),
                settings.max_polls,
            )),
            think_client: None,
            settings,
            tools: ToolRegistry::new(),
        })
    }

    #[tokio::test]
    async fn echo_returns_text_unchanged() {
        let mut registry = ToolRegistry::new();
        register(&mut registry);
        let handler = registry.get("echo").expect("echo registered");

        let result = handler(test_context(), serde_json::json!({"text": "hi"}), CancellationToken::new()).await;

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.content[0].text(), Some("hi"));
    }

    #[tokio::test]
    async fn echo_rejects_missing_text() {
        let mut registry = ToolRegistry::new();
        register(&mut registry);
        let handler = registry.get("echo").expect("echo registered");

        let result = handler(test_context(), serde_json::json!({}), CancellationToken::new()).await;

        assert!(result.is_error);
    }
}
