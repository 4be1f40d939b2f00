/// Provider Adapter
///
/// Thin facade over a Responses-style LLM provider: a `reqwest::Client` plus
/// an API key, POSTing `CreatePayload` JSON and parsing the tagged
/// `ProviderResponse` shape back.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;
use super::types::{CreatePayload, ProviderResponse};

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn create(&self, payload: CreatePayload) -> Result<ProviderResponse, GatewayError>;
    async fn retrieve(&self, response_id: &str) -> Result<ProviderResponse, GatewayError>;
}

/// HTTP implementation talking to an OpenAI-Responses-shaped endpoint.
pub struct HttpProviderAdapter {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpProviderAdapter {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn parse_or_reject(
        &self,
        response: reqwest::Response,
    ) -> Result<ProviderResponse, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::ProviderTransport(e.to_string()))?;

        if !status.is_success() {
            return Err(GatewayError::ProviderRejected {
                message: format!("HTTP {}: {}", status, body),
                response_id: None,
            });
        }

        serde_json::from_str::<ProviderResponse>(&body).map_err(|e| {
            GatewayError::ProviderRejected {
                message: format!("failed to parse provider response: {e}"),
                response_id: None,
            }
        })
    }
}

#[async_trait]
impl ProviderAdapter for HttpProviderAdapter {
    async fn create(&self, payload: CreatePayload) -> Result<ProviderResponse, GatewayError> {
        let url = format!("{}/responses", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::ProviderTransport(e.to_string()))?;
        self.parse_or_reject(response).await
    }

    /// Tolerates the two common retrieval signatures providers expose by
    /// trying a path-style GET first, then a query-param GET, before giving
    /// up.
    async fn retrieve(&self, response_id: &str) -> Result<ProviderResponse, GatewayError> {
        let path_url = format!(
            "{}/responses/{}",
            self.base_url.trim_end_matches('/'),
            response_id
        );
        let by_path = self
            .http
            .get(&path_url)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match by_path {
            Ok(resp) if resp.status().is_success() => return self.parse_or_reject(resp).await,
            Ok(resp) if !resp.status().as_u16().eq(&404) => return self.parse_or_reject(resp).await,
            _ => {}
        }

        let query_url = format!("{}/responses", self.base_url.trim_end_matches('/'));
        let by_query = self
            .http
            .get(&query_url)
            .bearer_auth(&self.api_key)
            .query(&[("response_id", response_id)])
            .send()
            .await
            .map_err(|e| GatewayError::ProviderTransport(e.to_string()))?;
        self.parse_or_reject(by_query).await
    }
}

/// Fallible cast of a JSON object's `metadata` member to the gateway's
/// string-keyed wire contract.
pub fn metadata_to_string_map(
    metadata: Option<&Value>,
) -> Option<std::collections::BTreeMap<String, String>> {
    let obj = metadata?.as_object()?;
    Some(
        obj.iter()
            .map(|(k, v)| {
                let s = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), s)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::ResponseStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_posts_to_responses_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "resp_1",
                "status": "queued",
            })))
            .mount(&server)
            .await;

        let adapter = HttpProviderAdapter::new("test-key", server.uri());
        let payload = CreatePayload {
            model: "gpt-test".to_string(),
            input: vec![serde_json::json!({"role": "user", "content": "hi"})],
            tools: None,
            tool_choice: None,
            metadata: None,
            previous_response_id: None,
            parallel_tool_calls: None,
        };

        let response = adapter.create(payload).await.unwrap();

        assert_eq!(response.id, "resp_1");
        assert_eq!(response.status, ResponseStatus::Queued);
    }

    #[tokio::test]
    async fn retrieve_falls_back_to_query_param_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/responses/resp_1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "resp_1",
                "status": "completed",
            })))
            .mount(&server)
            .await;

        let adapter = HttpProviderAdapter::new("test-key", server.uri());
        let response = adapter.retrieve("resp_1").await.unwrap();

        assert_eq!(response.status, ResponseStatus::Completed);
    }

    #[tokio::test]
    async fn create_rejects_on_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let adapter = HttpProviderAdapter::new("test-key", server.uri());
        let payload = CreatePayload {
            model: "gpt-test".to_string(),
            input: vec![],
            tools: None,
            tool_choice: None,
            metadata: None,
            previous_response_id: None,
            parallel_tool_calls: None,
        };

        let result = adapter.create(payload).await;

        assert!(matches!(result, Err(GatewayError::ProviderRejected { .. })));
    }

    #[test]
    fn metadata_to_string_map_stringifies_non_string_values() {
        let metadata = serde_json::json!({"a": "x", "b": 3});
        let map = metadata_to_string_map(Some(&metadata)).unwrap();

        assert_eq!(map.get("a").unwrap(), "x");
        assert_eq!(map.get("b").unwrap(), "3");
    }
}
