/// Think Processor
///
/// Partitions a turn's tool calls into `think` vs non-think, dispatches the
/// think calls to the Think Client, and builds `function_call_output`
/// follow-up inputs. Think calls may run concurrently, but results are
/// always sorted back into the provider's original call order before
/// building follow-ups.

use futures::future::join_all;
use serde_json::{json, Value};

use super::client::ThinkClient;
use crate::error::GatewayError;
use crate::provider::types::{ContentBlock, ToolCall};

#[derive(Debug, Clone, serde::Serialize)]
pub struct ThinkLogEntry {
    #[serde(rename = "callId")]
    pub call_id: String,
    pub status: ThinkStatus,
    pub result: ThinkLoggedResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ThinkLoggedResult {
    pub content: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

#[derive(Debug)]
pub struct ThinkProcessorOutput {
    pub follow_up_inputs: Vec<Value>,
    pub think_logs: Vec<ThinkLogEntry>,
    pub remaining_calls: Vec<ToolCall>,
}

pub async fn process(
    client: &dyn ThinkClient,
    tool_calls: Vec<ToolCall>,
) -> Result<ThinkProcessorOutput, GatewayError> {
    let (think_calls, remaining_calls): (Vec<_>, Vec<_>) = tool_calls
        .into_iter()
        .partition(|tc| tc.name == "think");

    if think_calls.is_empty() {
        return Ok(ThinkProcessorOutput {
            follow_up_inputs: Vec::new(),
            think_logs: Vec::new(),
            remaining_calls,
        });
    }

    for tc in &think_calls {
        if tc.call_id.trim().is_empty() {
            return Err(GatewayError::ThinkTool {
                message: "think tool call is missing a call_id".to_string(),
                metadata: None,
                logs: Vec::new(),
            });
        }
    }

    let futures = think_calls
        .iter()
        .map(|tc| invoke_one(client, tc));
    let mut outcomes: Vec<(usize, ThinkOutcome)> = join_all(futures).await;
    outcomes.sort_by_key(|(index, _)| *index);

    let mut follow_up_inputs = Vec::with_capacity(outcomes.len());
    let mut think_logs = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<(String, Value)> = None;

    for (_, outcome) in outcomes {
        let ThinkOutcome {
            call_id,
            content_json,
            metadata,
            is_error,
        } = outcome;

        if is_error {
            let message = content_json
                .iter()
                .filter_map(|c| c.get("text").and_then(|v| v.as_str()))
                .collect::<Vec<_>>()
                .join("\n\n");
            think_logs.push(ThinkLogEntry {
                call_id,
                status: ThinkStatus::Error,
                result: ThinkLoggedResult {
                    content: content_json,
                    metadata: Some(metadata.clone()),
                    is_error: true,
                },
            });
            if first_error.is_none() {
                let message = if message.is_empty() {
                    "think tool returned an error".to_string()
                } else {
                    message
                };
                first_error = Some((message, metadata));
            }
            continue;
        }

        let text = content_json
            .iter()
            .filter_map(|c| c.get("text").and_then(|v| v.as_str()))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = if text.is_empty() { "ok".to_string() } else { text };

        follow_up_inputs.push(json!({
            "type": "function_call_output",
            "call_id": call_id.clone(),
            "output": [{ "type": "input_text", "text": text }],
        }));

        think_logs.push(ThinkLogEntry {
            call_id,
            status: ThinkStatus::Ok,
            result: ThinkLoggedResult {
                content: content_json,
                metadata: Some(metadata),
                is_error: false,
            },
        });
    }

    // All outcomes (successful and errored) are folded into `think_logs` above
    // before returning, so an error from one call in a concurrent batch never
    // hides the log entries of calls that completed alongside it.
    if let Some((message, metadata)) = first_error {
        return Err(GatewayError::ThinkTool {
            message,
            metadata: Some(metadata),
            logs: think_logs
                .iter()
                .map(|entry| serde_json::to_value(entry).unwrap_or(Value::Null))
                .collect(),
        });
    }

    Ok(ThinkProcessorOutput {
        follow_up_inputs,
        think_logs,
        remaining_calls,
    })
}

struct ThinkOutcome {
    call_id: String,
    content_json: Vec<Value>,
    metadata: Value,
    is_error: bool,
}

async fn invoke_one(client: &dyn ThinkClient, tc: &ToolCall) -> (usize, ThinkOutcome) {
    let result = client.think(tc.arguments.clone()).await;
    let outcome = match result {
        Ok(r) => ThinkOutcome {
            call_id: tc.call_id.clone(),
            content_json: r.content.iter().map(ContentBlock::to_value).collect(),
            metadata: r.metadata,
            is_error: r.is_error,
        },
        Err(e) => ThinkOutcome {
            call_id: tc.call_id.clone(),
            content_json: vec![json!({"type": "text", "text": e.to_string()})],
            metadata: Value::Null,
            is_error: true,
        },
    };
    (tc.index, outcome)
}
