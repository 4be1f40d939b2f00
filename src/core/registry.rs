/// Tool Registry
///
/// Static `name → (ToolSpec, Handler)` map, built once at startup. Handlers
/// are async since the `chat` handler drives network I/O; they receive the
/// shared `AppContext` and a cancellation signal rather than reaching for
/// process-global state.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::provider::types::ToolResponse;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResponse> + Send>>;
pub type ToolHandler =
    Arc<dyn Fn(Arc<crate::core::context::AppContext>, Value, CancellationToken) -> ToolFuture + Send + Sync>;

pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Registers a tool. Panics at startup if the name is already taken,
    /// matching the registry's "rejects duplicate names" contract.
    pub fn register(&mut self, spec: ToolSpec, handler: ToolHandler) {
        if self.handlers.contains_key(&spec.name) {
            panic!("duplicate tool registration: {}", spec.name);
        }
        self.specs.push(spec.clone());
        self.handlers.insert(spec.name, handler);
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
