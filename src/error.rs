/// Gateway Error Taxonomy
///
/// Every failure the gateway can produce is one of the kinds below. The
/// dispatch boundary (see `core::server`) converts each kind into either a
/// JSON-RPC error object or an `is_error:true` tool response, per the
/// propagation policy: programming errors become JSON-RPC internal errors,
/// everything tool-shaped becomes a tool response so MCP clients can present
/// it uniformly.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("unknown or missing session")]
    Session,

    #[error("provider transport error: {0}")]
    ProviderTransport(String),

    #[error("provider rejected request: {message}")]
    ProviderRejected {
        message: String,
        response_id: Option<String>,
    },

    #[error("think tool error: {message}")]
    ThinkTool {
        message: String,
        metadata: Option<Value>,
        /// Log entries (already shaped for `metadata.thinkTool`) accumulated
        /// by the call that produced this error, so the caller can still
        /// surface them even though the call itself failed.
        logs: Vec<Value>,
    },

    #[error("Reached maximum tool iterations without completion.")]
    MaxTurnsExceeded,

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Standard JSON-RPC 2.0 error codes used by the router.
pub mod rpc_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SESSION_ERROR: i32 = -32001;
}
