/// Responses-style provider wire types
///
/// `model`, `input`, `previous_response_id`, tagged `output` items, generalized
/// into a total, statically-typed model: any `type` tag the provider sends
/// that we don't know about falls into an `Opaque(raw_json)` branch rather
/// than failing to deserialize.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct CreatePayload {
    pub model: String,
    pub input: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<std::collections::BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Incomplete,
}

impl ResponseStatus {
    /// Terminal statuses are anything outside `{queued, in_progress}`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResponseStatus::Queued | ResponseStatus::InProgress)
    }
}

/// Normalized view of a provider payload. Carries the original `raw` value
/// alongside the typed fields so the normalizer's fallback tiers (chat
/// completions shape, canonical JSON) can inspect shapes `ProviderResponse`
/// itself doesn't model.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub status: ResponseStatus,
    pub output: Vec<OutputItem>,
    pub usage: Option<Value>,
    pub finish_reason: Option<String>,
    pub model: Option<String>,
    pub raw: Value,
}

impl<'de> Deserialize<'de> for ProviderResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(ProviderResponse::from_raw(raw))
    }
}

impl ProviderResponse {
    pub fn from_raw(raw: Value) -> Self {
        let id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        // Missing or unrecognized status defaults to non-terminal so the poller
        // keeps polling instead of treating a partial payload as finished.
        let status = raw
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(|s| serde_json::from_value(Value::String(s.to_string())).ok())
            .unwrap_or(ResponseStatus::InProgress);
        let output = raw
            .get("output")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().cloned().map(OutputItem::from_raw).collect())
            .unwrap_or_default();
        let usage = raw.get("usage").cloned();
        let finish_reason = raw
            .get("finish_reason")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let model = raw.get("model").and_then(|v| v.as_str()).map(|s| s.to_string());

        ProviderResponse {
            id,
            status,
            output,
            usage,
            finish_reason,
            model,
            raw,
        }
    }
}

/// A single item of `output`. Known shapes are `message` and `function_call`;
/// anything else is kept as `Opaque(raw_json)` so normalization stays total.
#[derive(Debug, Clone)]
pub enum OutputItem {
    Message { content: Vec<ContentBlock> },
    FunctionCall {
        call_id: String,
        name: String,
        arguments_json: String,
    },
    Opaque(Value),
}

impl<'de> Deserialize<'de> for OutputItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(OutputItem::from_raw(raw))
    }
}

impl OutputItem {
    pub fn from_raw(raw: Value) -> Self {
        match raw.get("type").and_then(|v| v.as_str()) {
            Some("message") => {
                let content = raw
                    .get("content")
                    .and_then(|v| v.as_array())
                    .map(|items| items.iter().cloned().map(ContentBlock::from_raw).collect())
                    .unwrap_or_default();
                OutputItem::Message { content }
            }
            Some("function_call") => {
                let call_id = raw
                    .get("call_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let name = raw
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let arguments_json = raw
                    .get("arguments")
                    .and_then(|v| v.as_str())
                    .unwrap_or("{}")
                    .to_string();
                OutputItem::FunctionCall {
                    call_id,
                    name,
                    arguments_json,
                }
            }
            _ => OutputItem::Opaque(raw),
        }
    }
}

/// `{type:"text", text}` or `{type:"input_text", text}`; anything else
/// passes through opaquely as raw JSON.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text { text: String },
    InputText { text: String },
    Opaque(Value),
}

impl ContentBlock {
    pub fn from_raw(raw: Value) -> Self {
        match raw.get("type").and_then(|v| v.as_str()) {
            Some("text") => ContentBlock::Text {
                text: raw
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            },
            Some("input_text") => ContentBlock::InputText {
                text: raw
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            },
            _ => ContentBlock::Opaque(raw),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } | ContentBlock::InputText { text } => Some(text),
            ContentBlock::Opaque(_) => None,
        }
    }

    pub fn text_block(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn input_text_block(text: impl Into<String>) -> Self {
        ContentBlock::InputText { text: text.into() }
    }
}

// Manual `Serialize` impl so `{type:"text", ...}` / `{type:"input_text", ...}`
// round-trip with an explicit `type` tag (the derive above only covers the
// `untagged` struct-variant shape; the tag is added here for wire fidelity).
impl ContentBlock {
    pub fn to_value(&self) -> Value {
        match self {
            ContentBlock::Text { text } => serde_json::json!({"type": "text", "text": text}),
            ContentBlock::InputText { text } => {
                serde_json::json!({"type": "input_text", "text": text})
            }
            ContentBlock::Opaque(v) => v.clone(),
        }
    }
}

/// A provider-requested function call, normalized out of `OutputItem`.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
    /// Position among the function_call items in the turn that produced it;
    /// used to restore provider-supplied ordering after any parallel think
    /// dispatch.
    pub index: usize,
}

/// Uniform return value of any tool.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub content: Vec<ContentBlock>,
    pub tool_calls: Vec<ToolCall>,
    pub is_error: bool,
    pub metadata: serde_json::Map<String, Value>,
}

impl ToolResponse {
    pub fn ok(content: Vec<ContentBlock>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content,
            tool_calls,
            is_error: false,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text_block(text)],
            tool_calls: Vec::new(),
            is_error: true,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Wire shape for the `tools/call` result payload.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "content": self.content.iter().map(ContentBlock::to_value).collect::<Vec<_>>(),
            "toolCalls": self.tool_calls.iter().map(|tc| serde_json::json!({
                "callId": tc.call_id,
                "name": tc.name,
                "arguments": tc.arguments,
            })).collect::<Vec<_>>(),
            "isError": self.is_error,
            "metadata": Value::Object(self.metadata.clone()),
        })
    }
}
