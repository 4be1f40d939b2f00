/// JSON-RPC Router
///
/// Transport-agnostic dispatch over the MCP JSON-RPC surface: `initialize`,
/// `tools/list`, `tools/call`, `shutdown`, `ping`. Legacy dotted aliases
/// (`tools.list`, `tools.call`) are deliberately not recognized.
///
/// JSON-RPC-level errors use the standard `error.code` values; tool-level
/// failures are always a `result` carrying `isError:true` so MCP clients
/// handle them uniformly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::rpc_codes;
use crate::core::context::AppContext;

#[derive(Deserialize, Debug)]
pub struct RpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Serialize, Debug)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize, Debug)]
pub struct RpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl RpcResponse {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn internal_error(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::err(id, rpc_codes::INTERNAL_ERROR, message)
    }

    pub fn parse_error(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::err(id, rpc_codes::PARSE_ERROR, message)
    }
}

pub async fn dispatch(
    ctx: &Arc<AppContext>,
    request: RpcRequest,
    cancelled: &CancellationToken,
) -> RpcResponse {
    match request.method.as_str() {
        "initialize" => handle_initialize(ctx, request.id),
        "tools/list" => handle_tools_list(ctx, request.id),
        "tools/call" => handle_tools_call(ctx, request.id, request.params, cancelled).await,
        "ping" => RpcResponse::ok(request.id, serde_json::json!({})),
        "shutdown" => handle_shutdown(ctx, request.id, request.params),
        other => RpcResponse::err(
            request.id,
            rpc_codes::METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        ),
    }
}

fn handle_initialize(ctx: &Arc<AppContext>, id: Option<Value>) -> RpcResponse {
    let session = ctx.sessions.create();
    RpcResponse::ok(
        id,
        serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "sessionId": session.id,
            "serverInfo": {
                "name": ctx.settings.server_name,
                "version": ctx.settings.server_version,
            }
        }),
    )
}

fn handle_tools_list(ctx: &Arc<AppContext>, id: Option<Value>) -> RpcResponse {
    RpcResponse::ok(id, serde_json::json!({ "tools": ctx.tools.specs() }))
}

fn handle_shutdown(ctx: &Arc<AppContext>, id: Option<Value>, params: Option<Value>) -> RpcResponse {
    if let Some(session_id) = params.as_ref().and_then(|p| p.get("sessionId")).and_then(|v| v.as_str()) {
        ctx.sessions.evict(session_id);
    }
    RpcResponse::ok(id, serde_json::json!({}))
}

async fn handle_tools_call(
    ctx: &Arc<AppContext>,
    id: Option<Value>,
    params: Option<Value>,
    cancelled: &CancellationToken,
) -> RpcResponse {
    let params = match params {
        Some(p) => p,
        None => return RpcResponse::err(id, rpc_codes::INVALID_PARAMS, "missing params"),
    };

    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n,
        None => return RpcResponse::err(id, rpc_codes::INVALID_PARAMS, "missing tool name"),
    };

    let session_id = params.get("sessionId").and_then(|v| v.as_str());
    if ctx.sessions.validate(session_id).is_err() {
        return RpcResponse::err(id, rpc_codes::SESSION_ERROR, "unknown or missing session");
    }

    let handler = match ctx.tools.get(name) {
        Some(h) => h.clone(),
        None => {
            return RpcResponse::err(
                id,
                rpc_codes::METHOD_NOT_FOUND,
                format!("unknown tool: {name}"),
            )
        }
    };

    let arguments = params.get("arguments").cloned().unwrap_or(Value::Object(Default::default()));
    let response = handler(ctx.clone(), arguments, cancelled.clone()).await;
    RpcResponse::ok(id, response.to_value())
}
