/// Think Tool
///
/// Exposes the scratchpad think call directly through the tool catalog, in
/// addition to the chat orchestrator auto-injecting it into outbound
/// provider requests. Only registered when a think client is configured.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::context::AppContext;
use crate::core::registry::{ToolFuture, ToolRegistry, ToolSpec};
use crate::provider::types::ToolResponse;
use crate::think::client::ThinkClient;

pub fn register(registry: &mut ToolRegistry, client: Arc<dyn ThinkClient>) {
    let spec = ToolSpec {
        name: crate::think::NAME.to_string(),
        description: crate::think::DESCRIPTION.to_string(),
        input_schema: crate::think::input_schema(),
        output_schema: None,
    };

    registry.register(
        spec,
        Arc::new(
            move |_ctx: Arc<AppContext>, arguments: Value, _cancelled: CancellationToken| -> ToolFuture {
                let client = client.clone();
                Box::pin(async move {
                    match client.think(arguments).await {
                        Ok(result) => {
                            let mut response = ToolResponse::ok(result.content, Vec::new());
                            response.is_error = result.is_error;
                            if let Value::Object(map) = result.metadata {
                                response.metadata = map;
                            }
                            response
                        }
                        Err(e) => ToolResponse::error_text(e.to_string()),
                    }
                })
            },
        ),
    );
}
