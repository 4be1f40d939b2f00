/// Think Module
///
/// Client and turn-processor for the optional "think" scratchpad tool.

pub mod client;
pub mod processor;

use serde_json::Value;

pub const NAME: &str = "think";
pub const DESCRIPTION: &str = "Record intermediate reasoning before producing a final answer.";

/// JSON schema for the `thought` argument, shared between the tool catalog
/// entry and the function schema injected into provider requests.
pub fn input_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "thought": { "type": "string" }
        },
        "required": ["thought"]
    })
}

/// Provider-facing function-call schema for auto-injection into outbound
/// `tools` arrays.
pub fn provider_function_schema() -> Value {
    serde_json::json!({
        "type": "function",
        "name": NAME,
        "description": DESCRIPTION,
        "parameters": input_schema()
    })
}
