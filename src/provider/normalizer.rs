/// Response Normalizer
///
/// Folds a heterogeneous provider payload into `(content, tool_calls, meta)`.
/// Three-tier strategy: Responses-style `output_items` walk, falling back to
/// Chat-completions-style `choices[0].message`, falling back to a single
/// opaque text block of the raw payload so normalization never fails.

use serde_json::{Map, Value};

use super::types::{ContentBlock, OutputItem, ProviderResponse, ToolCall};

pub struct Normalized {
    pub content: Vec<ContentBlock>,
    pub tool_calls: Vec<ToolCall>,
    pub meta: Map<String, Value>,
}

pub fn normalize(response: &ProviderResponse) -> Normalized {
    let raw = &response.raw;
    let mut meta = Map::new();
    meta.insert("responseId".to_string(), Value::String(response.id.clone()));
    if let Some(usage) = &response.usage {
        meta.insert("usage".to_string(), usage.clone());
    }
    if let Some(finish_reason) = &response.finish_reason {
        meta.insert("finishReason".to_string(), Value::String(finish_reason.clone()));
    }
    if let Some(model) = &response.model {
        meta.insert("model".to_string(), Value::String(model.clone()));
    }

    if let Some((content, tool_calls)) = responses_style(response) {
        if !content.is_empty() || !tool_calls.is_empty() {
            return Normalized {
                content,
                tool_calls,
                meta,
            };
        }
    }

    if let Some((content, tool_calls)) = chat_completions_style(raw) {
        if !content.is_empty() || !tool_calls.is_empty() {
            return Normalized {
                content,
                tool_calls,
                meta,
            };
        }
    }

    let canonical = serde_json::to_string(raw).unwrap_or_else(|_| "null".to_string());
    Normalized {
        content: vec![ContentBlock::text_block(canonical)],
        tool_calls: Vec::new(),
        meta,
    }
}

fn responses_style(response: &ProviderResponse) -> Option<(Vec<ContentBlock>, Vec<ToolCall>)> {
    let mut content = Vec::new();
    let mut tool_calls = Vec::new();
    let mut call_index = 0usize;

    for item in &response.output {
        match item {
            OutputItem::Message { content: blocks } => {
                content.extend(blocks.iter().cloned());
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments_json,
            } => {
                let arguments = serde_json::from_str::<Value>(arguments_json)
                    .unwrap_or_else(|_| serde_json::json!({ "raw": arguments_json }));
                tool_calls.push(ToolCall {
                    call_id: call_id.clone(),
                    name: name.clone(),
                    arguments,
                    index: call_index,
                });
                call_index += 1;
            }
            OutputItem::Opaque(raw) => {
                content.push(ContentBlock::Opaque(raw.clone()));
            }
        }
    }

    Some((content, tool_calls))
}

fn chat_completions_style(raw: &Value) -> Option<(Vec<ContentBlock>, Vec<ToolCall>)> {
    let choice = raw.get("choices")?.as_array()?.first()?;
    let message = choice.get("message")?;

    let mut content = Vec::new();
    if let Some(text) = message.get("content").and_then(|v| v.as_str()) {
        content.push(ContentBlock::text_block(text));
    }

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for (index, call) in calls.iter().enumerate() {
            let call_id = call
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let function = call.get("function");
            let name = function
                .and_then(|f| f.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let arguments_json = function
                .and_then(|f| f.get("arguments"))
                .and_then(|v| v.as_str())
                .unwrap_or("{}");
            let arguments = serde_json::from_str::<Value>(arguments_json)
                .unwrap_or_else(|_| serde_json::json!({ "raw": arguments_json }));
            tool_calls.push(ToolCall {
                call_id,
                name,
                arguments,
                index,
            });
        }
    }

    if content.is_empty() && tool_calls.is_empty() {
        None
    } else {
        Some((content, tool_calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_style_extracts_message_text() {
        let response = ProviderResponse::from_raw(serde_json::json!({
            "id": "r1",
            "status": "completed",
            "output": [{"type": "message", "content": [{"type": "text", "text": "hello"}]}]
        }));

        let normalized = normalize(&response);

        assert_eq!(normalized.content[0].text(), Some("hello"));
        assert!(normalized.tool_calls.is_empty());
        assert_eq!(normalized.meta.get("responseId").unwrap(), "r1");
    }

    #[test]
    fn falls_back_to_chat_completions_shape() {
        let response = ProviderResponse::from_raw(serde_json::json!({
            "id": "r2",
            "choices": [{"message": {"content": "hi there", "tool_calls": []}}]
        }));

        let normalized = normalize(&response);

        assert_eq!(normalized.content[0].text(), Some("hi there"));
    }

    #[test]
    fn falls_back_to_canonical_json_for_unrecognized_shape() {
        let response = ProviderResponse::from_raw(serde_json::json!({
            "id": "r3",
            "something_else": 42
        }));

        let normalized = normalize(&response);

        assert_eq!(normalized.content.len(), 1);
        assert!(normalized.content[0].text().is_some());
    }

    #[test]
    fn normalization_is_total_for_empty_payload() {
        let response = ProviderResponse::from_raw(serde_json::json!({}));

        let normalized = normalize(&response);

        assert!(!normalized.content.is_empty());
    }
}
