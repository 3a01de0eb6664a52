use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use super::types::{test_run_body, ModelDescriptor, TestRunResult};
use crate::config::FlowDefinition;
use crate::error::{ApiError, RunError};

/// The model lookup answers 201 on success; nothing else counts
const MODEL_FOUND: StatusCode = StatusCode::CREATED;

/// A created test run: the fields we use plus the full body for the report
#[derive(Debug, Clone, PartialEq)]
pub struct TestRunResponse {
    pub run: TestRunResult,
    pub body: Value,
}

/// HTTP client for the Okareo API
pub struct OkareoClient {
    http: reqwest::Client,
    endpoint: String,
    base: Url,
    api_key: String,
}

impl OkareoClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RunError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("okareo-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RunError::Client)?;

        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let base = Url::parse(&endpoint).map_err(|e| RunError::Endpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(RunError::Endpoint {
                endpoint,
                reason: "not a base URL".to_string(),
            });
        }

        Ok(Self {
            http,
            endpoint,
            base,
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Endpoint plus `segments`, each percent-encoded as a single path segment
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `GET /v0/models_under_test/{model_id}`
    pub async fn fetch_model(&self, model_id: &str) -> Result<ModelDescriptor, ApiError> {
        let url = self.url(&["v0", "models_under_test", model_id]);
        let response = self
            .http
            .get(url.clone())
            .header("api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%url, status = status.as_u16(), "Model lookup");

        if status != MODEL_FOUND {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let model: ModelDescriptor = serde_json::from_str(&text)?;
        debug!(model_id = %model.id, "Model ID");
        Ok(model)
    }

    /// `POST /v0/test_run`
    pub async fn create_test_run(
        &self,
        flow: &FlowDefinition,
        provider: Option<&str>,
        provider_key: &str,
    ) -> Result<TestRunResponse, ApiError> {
        let url = self.url(&["v0", "test_run"]);
        let request_body = test_run_body(flow, provider, provider_key);

        let response = self
            .http
            .post(url.clone())
            .header("api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%url, status = status.as_u16(), "Test run created");

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!("Test Run: {}", serde_json::to_string_pretty(&body)?);
        }

        let run = TestRunResult::from_response(&body)?;
        Ok(TestRunResponse { run, body })
    }
}
