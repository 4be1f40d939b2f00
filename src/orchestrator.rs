/// Chat Orchestrator
///
/// The loop that drives the `chat` tool: submit → poll → normalize → think →
/// follow-up, bounded by `MAX_TURNS`. On each turn it submits a request,
/// polls until the provider reaches a terminal state, normalizes the
/// response, dispatches any `think` tool calls, and resubmits a follow-up
/// referencing the prior response until no more tool calls remain or the
/// turn cap is hit.
///
/// This is the only component allowed to mutate conversation state across
/// turns; everything it calls is stateless with respect to a single
/// request.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;
use crate::provider::adapter::{metadata_to_string_map, ProviderAdapter};
use crate::provider::normalizer::{self, Normalized};
use crate::provider::poller::ResponsePoller;
use crate::provider::types::{CreatePayload, ToolResponse};
use crate::think::client::ThinkClient;
use crate::think::processor::{self, ThinkLogEntry};
use crate::trace::{RunHandle, TraceAdapter, TraceContext};

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Value>,
    pub tools: Option<Vec<Value>>,
    pub tool_choice: Option<Value>,
    pub metadata: Option<Value>,
    pub parallel_tool_calls: Option<bool>,
}

impl ChatRequest {
    pub fn from_arguments(arguments: &Value) -> Result<Self, GatewayError> {
        let model = arguments
            .get("model")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::Validation("chat: \"model\" is required and must be non-empty".into()))?
            .to_string();

        let messages = arguments
            .get("messages")
            .and_then(|v| v.as_array())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| GatewayError::Validation("chat: \"messages\" is required and must be non-empty".into()))?
            .clone();

        for message in &messages {
            let role = message.get("role").and_then(|v| v.as_str());
            match role {
                Some("user") | Some("developer") | Some("assistant") | Some("system") | Some("tool") => {}
                _ => {
                    return Err(GatewayError::Validation(
                        "chat: each message must have role in {user, developer, assistant, system, tool}".into(),
                    ))
                }
            }
        }

        Ok(Self {
            model,
            messages,
            tools: arguments.get("tools").and_then(|v| v.as_array()).cloned(),
            tool_choice: arguments.get("tool_choice").cloned(),
            metadata: arguments.get("metadata").cloned(),
            parallel_tool_calls: arguments.get("parallel_tool_calls").and_then(|v| v.as_bool()),
        })
    }
}

pub struct ChatOrchestrator {
    provider: Arc<dyn ProviderAdapter>,
    poller: Arc<ResponsePoller>,
    think_client: Option<Arc<dyn ThinkClient>>,
    max_turns: u32,
    think_tool_enabled: bool,
    langsmith_tracing: bool,
    langsmith_project: Option<String>,
}

impl ChatOrchestrator {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        poller: Arc<ResponsePoller>,
        think_client: Option<Arc<dyn ThinkClient>>,
        max_turns: u32,
        think_tool_enabled: bool,
        langsmith_tracing: bool,
        langsmith_project: Option<String>,
    ) -> Self {
        Self {
            provider,
            poller,
            think_client,
            max_turns,
            think_tool_enabled,
            langsmith_tracing,
            langsmith_project,
        }
    }

    pub async fn run(&self, request: ChatRequest, cancelled: &CancellationToken) -> ToolResponse {
        let trace = TraceContext::from_request_metadata(
            request.metadata.as_ref(),
            self.langsmith_tracing,
            self.langsmith_project.as_deref(),
        );
        let run_handle = trace.map(|ctx| {
            TraceAdapter::start(ctx, "chat", &serde_json::json!({ "model": request.model }))
        });

        let result = self.run_inner(&request, cancelled).await;

        self.finalize_trace(run_handle, &result)
    }

    fn finalize_trace(&self, run_handle: Option<RunHandle>, result: &ToolResponse) -> ToolResponse {
        let mut result = result.clone();
        if let Some(handle) = run_handle {
            let ctx = if result.is_error {
                TraceAdapter::finalize_error(&handle, "chat invocation failed")
            } else {
                TraceAdapter::finalize_success(&handle, &result.to_value())
            };
            result
                .metadata
                .insert("langsmith".to_string(), serde_json::to_value(ctx).unwrap_or(Value::Null));
        }
        result
    }

    async fn run_inner(&self, request: &ChatRequest, cancelled: &CancellationToken) -> ToolResponse {
        if cancelled.is_cancelled() {
            return ToolResponse::error_text("request cancelled");
        }

        let mut think_logs: Vec<ThinkLogEntry> = Vec::new();
        let metadata_map = metadata_to_string_map(request.metadata.as_ref());

        let initial_payload = self.build_initial_payload(request, metadata_map.clone());
        let mut previous_response_id: Option<String> = None;
        let mut input_override: Option<Vec<Value>> = None;

        for turn in 0..self.max_turns {
            if cancelled.is_cancelled() {
                return ToolResponse::error_text("request cancelled")
                    .with_metadata(think_log_metadata(Map::new(), &think_logs));
            }

            let payload = match (&previous_response_id, &input_override) {
                (Some(prev), Some(input)) => CreatePayload {
                    model: request.model.clone(),
                    input: input.clone(),
                    tools: None,
                    tool_choice: None,
                    metadata: metadata_map.clone(),
                    previous_response_id: Some(prev.clone()),
                    parallel_tool_calls: request.parallel_tool_calls,
                },
                _ => initial_payload.clone(),
            };

            let created = match self.provider.create(payload).await {
                Ok(resp) => resp,
                Err(e) => return provider_error_response(e, &think_logs),
            };

            let resolved = self.poller.resolve(self.provider.as_ref(), created, cancelled).await;
            let Normalized { content, tool_calls, mut meta } = normalizer::normalize(&resolved);

            previous_response_id = Some(resolved.id.clone());

            if tool_calls.is_empty() {
                meta = think_log_metadata(meta, &think_logs);
                return ToolResponse::ok(content, Vec::new()).with_metadata(meta);
            }

            let think_client = match &self.think_client {
                Some(client) if self.think_tool_enabled => client.clone(),
                _ => {
                    meta = think_log_metadata(meta, &think_logs);
                    return ToolResponse::ok(content, tool_calls).with_metadata(meta);
                }
            };

            let output = match processor::process(think_client.as_ref(), tool_calls).await {
                Ok(output) => output,
                Err(e) => return provider_error_response(e, &think_logs),
            };
            think_logs.extend(output.think_logs);

            if !output.remaining_calls.is_empty() {
                tracing::debug!(
                    turn,
                    remaining = output.remaining_calls.len(),
                    "non-think tool calls present alongside a think call in the same turn, deferring to caller"
                );
                meta = think_log_metadata(meta, &think_logs);
                return ToolResponse::ok(content, output.remaining_calls).with_metadata(meta);
            }

            if output.follow_up_inputs.is_empty() {
                meta = think_log_metadata(meta, &think_logs);
                return ToolResponse::ok(content, Vec::new()).with_metadata(meta);
            }

            input_override = Some(output.follow_up_inputs);
        }

        ToolResponse::error_text("Reached maximum tool iterations without completion.")
            .with_metadata(think_log_metadata(Map::new(), &think_logs))
    }

    fn build_initial_payload(
        &self,
        request: &ChatRequest,
        metadata: Option<BTreeMap<String, String>>,
    ) -> CreatePayload {
        let mut tools = request.tools.clone().unwrap_or_default();
        let already_has_think = tools
            .iter()
            .any(|t| t.get("name").and_then(|v| v.as_str()) == Some(crate::think::NAME));
        if self.think_tool_enabled && self.think_client.is_some() && !already_has_think {
            tools.push(crate::think::provider_function_schema());
        }

        CreatePayload {
            model: request.model.clone(),
            input: request.messages.clone(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice: request.tool_choice.clone(),
            metadata,
            previous_response_id: None,
            parallel_tool_calls: request.parallel_tool_calls,
        }
    }
}

fn think_log_metadata(mut meta: Map<String, Value>, logs: &[ThinkLogEntry]) -> Map<String, Value> {
    if !logs.is_empty() {
        meta.insert(
            "thinkTool".to_string(),
            serde_json::to_value(logs).unwrap_or(Value::Array(Vec::new())),
        );
    }
    meta
}

fn provider_error_response(error: GatewayError, think_logs: &[ThinkLogEntry]) -> ToolResponse {
    match error {
        GatewayError::ThinkTool { message, metadata: think_meta, logs } => {
            let mut combined: Vec<Value> = think_logs
                .iter()
                .map(|entry| serde_json::to_value(entry).unwrap_or(Value::Null))
                .collect();
            combined.extend(logs);

            let mut meta = Map::new();
            if !combined.is_empty() {
                meta.insert("thinkTool".to_string(), Value::Array(combined));
            }
            if let Some(m) = think_meta {
                meta.insert("thinkError".to_string(), m);
            }
            ToolResponse::error_text(message).with_metadata(meta)
        }
        GatewayError::ProviderRejected { message, response_id } => {
            let mut meta = think_log_metadata(Map::new(), think_logs);
            if let Some(id) = response_id {
                meta.insert("responseId".to_string(), Value::String(id));
            }
            ToolResponse::error_text(message).with_metadata(meta)
        }
        GatewayError::ProviderTransport(message) => {
            ToolResponse::error_text(message).with_metadata(think_log_metadata(Map::new(), think_logs))
        }
        GatewayError::Cancelled => ToolResponse::error_text("request cancelled")
            .with_metadata(think_log_metadata(Map::new(), think_logs)),
        other => ToolResponse::error_text(other.to_string())
            .with_metadata(think_log_metadata(Map::new(), think_logs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    use crate::provider::types::{ContentBlock, ProviderResponse};
    use crate::think::client::ThinkResult;

    struct ScriptedProvider {
        responses: Mutex<VecDeque<ProviderResponse>>,
        captured: Mutex<Vec<CreatePayload>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<ProviderResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                captured: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedProvider {
        async fn create(&self, payload: CreatePayload) -> Result<ProviderResponse, GatewayError> {
            self.captured.lock().unwrap().push(payload);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| GatewayError::Internal("no more scripted responses".into()))
        }

        async fn retrieve(&self, _response_id: &str) -> Result<ProviderResponse, GatewayError> {
            Err(GatewayError::Internal("retrieve not expected in this test".into()))
        }
    }

    struct AlwaysThinkProvider {
        counter: AtomicU64,
    }

    #[async_trait]
    impl ProviderAdapter for AlwaysThinkProvider {
        async fn create(&self, _payload: CreatePayload) -> Result<ProviderResponse, GatewayError> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderResponse::from_raw(serde_json::json!({
                "id": format!("resp_{n}"),
                "status": "completed",
                "output": [{
                    "type": "function_call",
                    "call_id": format!("c_{n}"),
                    "name": "think",
                    "arguments": "{}",
                }]
            })))
        }

        async fn retrieve(&self, _response_id: &str) -> Result<ProviderResponse, GatewayError> {
            Err(GatewayError::Internal("retrieve not expected in this test".into()))
        }
    }

    struct ScriptedThink {
        replies: Mutex<VecDeque<Result<ThinkResult, GatewayError>>>,
    }

    #[async_trait]
    impl ThinkClient for ScriptedThink {
        async fn think(&self, _arguments: Value) -> Result<ThinkResult, GatewayError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Internal("no more scripted think replies".into())))
        }
    }

    fn test_poller() -> Arc<ResponsePoller> {
        Arc::new(ResponsePoller::new(
            Arc::new(tokio::sync::Semaphore::new(8)),
            std::time::Duration::from_secs(0),
            60,
        ))
    }

    fn message_response(id: &str, text: &str) -> ProviderResponse {
        ProviderResponse::from_raw(serde_json::json!({
            "id": id,
            "status": "completed",
            "output": [{
                "type": "message",
                "content": [{"type": "text", "text": text}]
            }]
        }))
    }

    #[tokio::test]
    async fn no_tool_calls_returns_directly() {
        let provider = Arc::new(ScriptedProvider::new(vec![message_response("resp_1", "hello world")]));
        let orchestrator = ChatOrchestrator::new(provider, test_poller(), None, 15, false, false, None);

        let request = ChatRequest::from_arguments(&serde_json::json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let result = orchestrator.run(request, &CancellationToken::new()).await;

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.content[0].text(), Some("hello world"));
        assert!(result.tool_calls.is_empty());
        assert_eq!(
            result.metadata.get("responseId").and_then(|v| v.as_str()),
            Some("resp_1")
        );
    }

    #[tokio::test]
    async fn think_round_trip_resubmits_with_previous_response_id() {
        let first = ProviderResponse::from_raw(serde_json::json!({
            "id": "resp_1",
            "status": "completed",
            "output": [{
                "type": "function_call",
                "call_id": "c1",
                "name": "think",
                "arguments": "{\"thought\":\"plan\"}",
            }]
        }));
        let second = message_response("resp_2", "done");
        let provider = Arc::new(ScriptedProvider::new(vec![first, second]));

        let think_client: Arc<dyn ThinkClient> = Arc::new(ScriptedThink {
            replies: Mutex::new(VecDeque::from(vec![Ok(ThinkResult {
                content: vec![ContentBlock::text_block("recorded")],
                metadata: Value::Null,
                is_error: false,
            })])),
        });

        let orchestrator = ChatOrchestrator::new(
            provider.clone(),
            test_poller(),
            Some(think_client),
            15,
            true,
            false,
            None,
        );

        let request = ChatRequest::from_arguments(&serde_json::json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let result = orchestrator.run(request, &CancellationToken::new()).await;

        assert!(!result.is_error);
        assert_eq!(result.content[0].text(), Some("done"));

        let think_tool = result.metadata.get("thinkTool").unwrap().as_array().unwrap();
        assert_eq!(think_tool.len(), 1);
        assert_eq!(think_tool[0]["callId"], "c1");
        assert_eq!(think_tool[0]["status"], "ok");

        let captured = provider.captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[1].previous_response_id.as_deref(), Some("resp_1"));
        assert_eq!(captured[1].input[0]["call_id"], "c1");
    }

    #[tokio::test]
    async fn max_turns_exceeded_surfaces_error_with_full_think_log() {
        let provider = Arc::new(AlwaysThinkProvider {
            counter: AtomicU64::new(0),
        });
        let think_client: Arc<dyn ThinkClient> = Arc::new(ScriptedThink {
            replies: Mutex::new(
                std::iter::repeat_with(|| {
                    Ok(ThinkResult {
                        content: vec![ContentBlock::text_block("more")],
                        metadata: Value::Null,
                        is_error: false,
                    })
                })
                .take(15)
                .collect(),
            ),
        });

        let orchestrator = ChatOrchestrator::new(provider, test_poller(), Some(think_client), 15, true, false, None);

        let request = ChatRequest::from_arguments(&serde_json::json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let result = orchestrator.run(request, &CancellationToken::new()).await;

        assert!(result.is_error);
        assert_eq!(
            result.content[0].text(),
            Some("Reached maximum tool iterations without completion.")
        );
        let think_tool = result.metadata.get("thinkTool").unwrap().as_array().unwrap();
        assert_eq!(think_tool.len(), 15);
    }

    #[tokio::test]
    async fn errored_think_call_is_surfaced_in_think_tool_metadata() {
        let response = ProviderResponse::from_raw(serde_json::json!({
            "id": "resp_1",
            "status": "completed",
            "output": [{
                "type": "function_call",
                "call_id": "c1",
                "name": "think",
                "arguments": "{\"thought\":\"plan\"}",
            }]
        }));
        let provider = Arc::new(ScriptedProvider::new(vec![response]));

        let think_client: Arc<dyn ThinkClient> = Arc::new(ScriptedThink {
            replies: Mutex::new(VecDeque::from(vec![Ok(ThinkResult {
                content: vec![ContentBlock::text_block("boom")],
                metadata: Value::Null,
                is_error: true,
            })])),
        });

        let orchestrator = ChatOrchestrator::new(provider, test_poller(), Some(think_client), 15, true, false, None);

        let request = ChatRequest::from_arguments(&serde_json::json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let result = orchestrator.run(request, &CancellationToken::new()).await;

        assert!(result.is_error);
        let think_tool = result.metadata.get("thinkTool").unwrap().as_array().unwrap();
        assert_eq!(think_tool.len(), 1);
        assert_eq!(think_tool[0]["callId"], "c1");
        assert_eq!(think_tool[0]["status"], "error");
    }

    #[tokio::test]
    async fn non_think_call_alongside_think_call_is_deferred_to_caller() {
        let response = ProviderResponse::from_raw(serde_json::json!({
            "id": "resp_1",
            "status": "completed",
            "output": [
                {
                    "type": "function_call",
                    "call_id": "c1",
                    "name": "think",
                    "arguments": "{\"thought\":\"plan\"}",
                },
                {
                    "type": "function_call",
                    "call_id": "w1",
                    "name": "web_search",
                    "arguments": "{}",
                }
            ]
        }));
        let provider = Arc::new(ScriptedProvider::new(vec![response]));

        let think_client: Arc<dyn ThinkClient> = Arc::new(ScriptedThink {
            replies: Mutex::new(VecDeque::from(vec![Ok(ThinkResult {
                content: vec![ContentBlock::text_block("recorded")],
                metadata: Value::Null,
                is_error: false,
            })])),
        });

        let orchestrator = ChatOrchestrator::new(provider.clone(), test_poller(), Some(think_client), 15, true, false, None);

        let request = ChatRequest::from_arguments(&serde_json::json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let result = orchestrator.run(request, &CancellationToken::new()).await;

        assert!(!result.is_error);
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].call_id, "w1");
        let think_tool = result.metadata.get("thinkTool").unwrap().as_array().unwrap();
        assert_eq!(think_tool.len(), 1);
        assert_eq!(think_tool[0]["callId"], "c1");
        assert_eq!(provider.captured.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_think_tool_call_is_deferred_without_follow_up() {
        let response = ProviderResponse::from_raw(serde_json::json!({
            "id": "resp_1",
            "status": "completed",
            "output": [{
                "type": "function_call",
                "call_id": "w1",
                "name": "web_search",
                "arguments": "{}",
            }]
        }));
        let provider = Arc::new(ScriptedProvider::new(vec![response]));

        let orchestrator = ChatOrchestrator::new(provider.clone(), test_poller(), None, 15, false, false, None);

        let request = ChatRequest::from_arguments(&serde_json::json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let result = orchestrator.run(request, &CancellationToken::new()).await;

        assert!(!result.is_error);
        assert!(result.content.is_empty());
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].call_id, "w1");
        assert_eq!(result.tool_calls[0].name, "web_search");
        assert_eq!(provider.captured.lock().unwrap().len(), 1);
    }

    #[test]
    fn chat_request_rejects_empty_messages() {
        let err = ChatRequest::from_arguments(&serde_json::json!({
            "model": "gpt-test",
            "messages": []
        }))
        .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn chat_request_rejects_blank_model() {
        let err = ChatRequest::from_arguments(&serde_json::json!({
            "model": "",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }
}
