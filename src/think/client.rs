/// Think Client
///
/// MCP JSON-RPC client over HTTP to an external "think" server. Performs a
/// one-time `initialize`/`tools/list` handshake, then issues `tools/call`
/// with `name="think"`. Retries transport failures with exponential backoff
/// up to `THINK_RETRY_LIMIT`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

use crate::error::GatewayError;
use crate::provider::types::ContentBlock;

#[derive(Debug, Clone)]
pub struct ThinkResult {
    pub content: Vec<ContentBlock>,
    pub metadata: Value,
    pub is_error: bool,
}

#[async_trait]
pub trait ThinkClient: Send + Sync {
    async fn think(&self, arguments: Value) -> Result<ThinkResult, GatewayError>;
}

pub struct HttpThinkClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    retry_limit: u32,
    handshaken: AtomicBool,
}

impl HttpThinkClient {
    pub fn new(url: impl Into<String>, timeout_ms: u64, retry_limit: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            timeout: Duration::from_millis(timeout_ms),
            retry_limit,
            handshaken: AtomicBool::new(false),
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = tokio::time::timeout(
            self.timeout,
            self.http.post(&self.url).json(&body).send(),
        )
        .await
        .map_err(|_| GatewayError::ProviderTransport("think server request timed out".into()))?
        .map_err(|e| GatewayError::ProviderTransport(e.to_string()))?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ProviderTransport(e.to_string()))?;

        if let Some(error) = value.get("error") {
            return Err(GatewayError::ThinkTool {
                message: error
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("think server returned an error")
                    .to_string(),
                metadata: None,
                logs: Vec::new(),
            });
        }

        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn ensure_handshake(&self) -> Result<(), GatewayError> {
        if self.handshaken.load(Ordering::Acquire) {
            return Ok(());
        }
        self.rpc_call("initialize", json!({})).await?;
        let _ = self.rpc_call("tools/list", json!({})).await;
        self.handshaken.store(true, Ordering::Release);
        Ok(())
    }

    async fn call_with_retry(&self, arguments: Value) -> Result<Value, GatewayError> {
        let mut last_err = None;
        for attempt in 0..=self.retry_limit {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            match self
                .rpc_call(
                    "tools/call",
                    json!({ "name": "think", "arguments": arguments }),
                )
                .await
            {
                Ok(result) => return Ok(result),
                Err(e @ GatewayError::ThinkTool { .. }) => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "think tool call attempt failed, retrying");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| GatewayError::ProviderTransport("think call exhausted retries".into())))
    }
}

#[async_trait]
impl ThinkClient for HttpThinkClient {
    async fn think(&self, arguments: Value) -> Result<ThinkResult, GatewayError> {
        self.ensure_handshake().await?;
        let result = self.call_with_retry(arguments).await?;

        let is_error = result
            .get("isError")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let content = result
            .get("content")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().cloned().map(ContentBlock::from_raw).collect())
            .unwrap_or_default();

        let metadata = result.get("metadata").cloned().unwrap_or(Value::Null);

        Ok(ThinkResult {
            content,
            metadata,
            is_error,
        })
    }
}
