/// Trace Adapter
///
/// Optional run lifecycle wrapper around a chat invocation, shaped after the
/// LangSmith run API. Activation is implicit: a trace is created only if the
/// request metadata opts in or already carries a parent.
///
/// The provider only preserves `metadata` as a string-keyed map of string
/// values, so `TraceContext` is serialized to a single JSON string under
/// `LANGSMITH_METADATA_KEY` before submission and parsed back out of the
/// final `meta` map.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LANGSMITH_METADATA_KEY: &str = "langsmith";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceContext {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl TraceContext {
    /// Reads `metadata.langsmith` from a chat request and decides whether a
    /// trace should be started. Returns `None` when tracing is inactive.
    pub fn from_request_metadata(
        metadata: Option<&Value>,
        env_tracing_enabled: bool,
        env_project: Option<&str>,
    ) -> Option<Self> {
        let sub = metadata.and_then(|m| m.get(LANGSMITH_METADATA_KEY));

        let mut ctx: TraceContext = match sub {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
            None => TraceContext::default(),
        };

        let has_parent = ctx.parent_run_id.is_some() || ctx.trace_id.is_some();
        let active = ctx.enabled || has_parent || env_tracing_enabled;
        if !active {
            return None;
        }

        ctx.enabled = true;
        if ctx.project.is_none() {
            ctx.project = env_project.map(|p| p.to_string());
        }
        Some(ctx)
    }

    pub fn to_metadata_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_metadata_string(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

pub struct RunHandle {
    pub run_id: String,
    context: TraceContext,
}

/// Stub lifecycle API for the distributed tracing backend. The backend
/// itself is out of scope here; this only shapes the calls and threads the
/// trace context through the orchestrator.
pub struct TraceAdapter;

impl TraceAdapter {
    pub fn start(context: TraceContext, run_name: &str, inputs: &Value) -> RunHandle {
        tracing::debug!(run_name, inputs = %inputs, "trace run started");
        let run_id = context
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        RunHandle {
            run_id,
            context,
        }
    }

    pub fn finalize_success(handle: &RunHandle, outputs: &Value) -> TraceContext {
        tracing::debug!(run_id = %handle.run_id, outputs = %outputs, "trace run completed");
        let mut ctx = handle.context.clone();
        ctx.run_id = Some(handle.run_id.clone());
        ctx
    }

    pub fn finalize_error(handle: &RunHandle, error: &str) -> TraceContext {
        tracing::debug!(run_id = %handle.run_id, error, "trace run failed");
        let mut ctx = handle.context.clone();
        ctx.run_id = Some(handle.run_id.clone());
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_without_flag_or_parent() {
        let metadata = serde_json::json!({});
        assert!(TraceContext::from_request_metadata(Some(&metadata), false, None).is_none());
    }

    #[test]
    fn activates_on_explicit_enabled() {
        let metadata = serde_json::json!({ "langsmith": { "enabled": true } });
        let ctx = TraceContext::from_request_metadata(Some(&metadata), false, None).unwrap();
        assert!(ctx.enabled);
    }

    #[test]
    fn activates_on_parent_run_id() {
        let metadata = serde_json::json!({ "langsmith": { "parent_run_id": "p1" } });
        let ctx = TraceContext::from_request_metadata(Some(&metadata), false, None).unwrap();
        assert!(ctx.enabled);
        assert_eq!(ctx.parent_run_id.as_deref(), Some("p1"));
    }

    #[test]
    fn activates_on_env_flag() {
        let ctx = TraceContext::from_request_metadata(None, true, Some("proj")).unwrap();
        assert!(ctx.enabled);
        assert_eq!(ctx.project.as_deref(), Some("proj"));
    }

    #[test]
    fn serialization_round_trip() {
        let ctx = TraceContext {
            enabled: true,
            parent_run_id: Some("p1".into()),
            trace_id: Some("t1".into()),
            run_id: Some("r1".into()),
            project: Some("proj".into()),
            tags: vec!["a".into(), "b".into()],
            metadata: serde_json::Map::new(),
        };
        let raw = ctx.to_metadata_string();
        let round_tripped = TraceContext::from_metadata_string(&raw).unwrap();
        assert_eq!(ctx, round_tripped);
    }
}
