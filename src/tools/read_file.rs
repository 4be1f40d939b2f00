/// Read File Tool
///
/// Reads a file relative to the process's working directory and rejects any
/// path that escapes it.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::context::AppContext;
use crate::core::registry::{ToolFuture, ToolRegistry, ToolSpec};
use crate::provider::types::{ContentBlock, ToolResponse};

pub fn register(registry: &mut ToolRegistry) {
    let spec = ToolSpec {
        name: "read_file".to_string(),
        description: "Read a text file relative to the server's working directory.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the working directory" }
            },
            "required": ["path"]
        }),
        output_schema: None,
    };

    registry.register(
        spec,
        Arc::new(
            |_ctx: Arc<AppContext>, arguments: Value, _cancelled: CancellationToken| -> ToolFuture {
                Box::pin(async move { read_file(&arguments).await })
            },
        ),
    );
}

async fn read_file(arguments: &Value) -> ToolResponse {
    let requested = match arguments.get("path").and_then(|v| v.as_str()) {
        Some(p) => p,
        None => return ToolResponse::error_text("read_file: \"path\" is required and must be a string"),
    };

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => return ToolResponse::error_text(format!("read_file: cannot resolve working directory: {e}")),
    };

    let candidate = cwd.join(requested);
    let resolved = match candidate.canonicalize() {
        Ok(p) => p,
        Err(e) => return ToolResponse::error_text(format!("read_file: {requested}: {e}")),
    };

    if !resolved.starts_with(&cwd) {
        return ToolResponse::error_text(format!(
            "read_file: {requested} escapes the working directory"
        ));
    }

    match tokio::fs::read_to_string(&resolved).await {
        Ok(contents) => ToolResponse::ok(vec![ContentBlock::text_block(contents)], Vec::new()),
        Err(e) => ToolResponse::error_text(format!("read_file: {requested}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // `read_file` resolves against `std::env::current_dir`, which is process-
    // global; serialize tests that change it so they don't race each other.
    static CWD_LOCK: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn reads_file_within_working_directory() {
        let _guard = CWD_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.txt"), "hello world").unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let result = read_file(&serde_json::json!({"path": "note.txt"})).await;

        std::env::set_current_dir(original).unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content[0].text(), Some("hello world"));
    }

    #[tokio::test]
    async fn rejects_path_escaping_working_directory() {
        let _guard = CWD_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path().join("sub")).unwrap();

        let result = read_file(&serde_json::json!({"path": "../../etc/passwd"})).await;

        std::env::set_current_dir(original).unwrap();

        assert!(result.is_error);
    }

    #[tokio::test]
    async fn rejects_missing_path_argument() {
        let result = read_file(&serde_json::json!({})).await;

        assert!(result.is_error);
    }
}
