/// Response Poller
///
/// Bounded-concurrency polling of a non-terminal provider response until a
/// terminal status is reached or `MAX_POLLS` is exhausted. Acquires a permit
/// from a process-wide semaphore before each retrieval so the number of
/// concurrent in-flight polls stays bounded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::warn;

use super::adapter::ProviderAdapter;
use super::types::ProviderResponse;
use crate::error::GatewayError;

pub struct ResponsePoller {
    semaphore: Arc<Semaphore>,
    poll_delay: Duration,
    max_polls: u32,
}

impl ResponsePoller {
    pub fn new(semaphore: Arc<Semaphore>, poll_delay: Duration, max_polls: u32) -> Self {
        Self {
            semaphore,
            poll_delay,
            max_polls,
        }
    }

    /// Resolve `initial` to a terminal state, or return the last observed
    /// state if `MAX_POLLS` is exhausted or the request is cancelled. Never
    /// fails the overall request on transport errors — those are logged and
    /// treated as no new information.
    pub async fn resolve(
        &self,
        adapter: &dyn ProviderAdapter,
        initial: ProviderResponse,
        cancelled: &tokio_util::sync::CancellationToken,
    ) -> ProviderResponse {
        if initial.status.is_terminal() {
            return initial;
        }

        let response_id = initial.id.clone();
        let mut current = initial;

        for attempt in 0..self.max_polls {
            if cancelled.is_cancelled() {
                return current;
            }

            if attempt > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_delay) => {}
                    _ = cancelled.cancelled() => return current,
                }
            }

            let permit = tokio::select! {
                permit = tokio::time::timeout(Duration::from_secs(5), self.semaphore.acquire()) => permit,
                _ = cancelled.cancelled() => return current,
            };

            let _permit = match permit {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => {
                    // Semaphore closed; nothing we can do but return what we have.
                    return current;
                }
                Err(_elapsed) => {
                    warn!(response_id = %response_id, "poll semaphore acquire timed out after 5s, returning last known state");
                    return current;
                }
            };

            match adapter.retrieve(&response_id).await {
                Ok(next) => {
                    current = next;
                    if current.status.is_terminal() {
                        return current;
                    }
                }
                Err(GatewayError::ProviderTransport(e)) | Err(GatewayError::ProviderRejected { message: e, .. }) => {
                    warn!(response_id = %response_id, error = %e, "poll retrieval failed, treating as no new information");
                }
                Err(other) => {
                    warn!(response_id = %response_id, error = %other, "unexpected poll error, treating as no new information");
                }
            }
        }

        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedRetrieval {
        statuses: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedRetrieval {
        async fn create(&self, _payload: super::super::types::CreatePayload) -> Result<ProviderResponse, GatewayError> {
            unreachable!("poller only calls retrieve")
        }

        async fn retrieve(&self, response_id: &str) -> Result<ProviderResponse, GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self.statuses[n];
            Ok(ProviderResponse::from_raw(serde_json::json!({
                "id": response_id,
                "status": status,
                "output": if status == "completed" {
                    serde_json::json!([{"type": "message", "content": [{"type": "text", "text": "ok"}]}])
                } else {
                    serde_json::json!([])
                }
            })))
        }
    }

    #[tokio::test]
    async fn polls_until_terminal_and_stops() {
        let adapter = ScriptedRetrieval {
            statuses: vec!["in_progress", "in_progress", "completed"],
            calls: AtomicUsize::new(0),
        };
        let poller = ResponsePoller::new(Arc::new(Semaphore::new(8)), Duration::from_millis(0), 10);
        let initial = ProviderResponse::from_raw(serde_json::json!({ "id": "r", "status": "queued" }));

        let resolved = poller
            .resolve(&adapter, initial, &tokio_util::sync::CancellationToken::new())
            .await;

        assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);
        assert_eq!(resolved.id, "r");
        assert!(resolved.status.is_terminal());
    }

    #[tokio::test]
    async fn already_terminal_response_is_returned_without_polling() {
        let adapter = ScriptedRetrieval {
            statuses: vec![],
            calls: AtomicUsize::new(0),
        };
        let poller = ResponsePoller::new(Arc::new(Semaphore::new(8)), Duration::from_millis(0), 10);
        let initial = ProviderResponse::from_raw(serde_json::json!({ "id": "r", "status": "completed" }));

        let resolved = poller
            .resolve(&adapter, initial, &tokio_util::sync::CancellationToken::new())
            .await;

        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolved.id, "r");
    }
}
