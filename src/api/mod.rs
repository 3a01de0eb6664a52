mod client;
mod types;

use async_trait::async_trait;

use crate::config::FlowDefinition;
use crate::error::ApiError;

pub use client::{OkareoClient, TestRunResponse};
pub use types::{provider_credential, ModelDescriptor, TestRunResult};

/// The two remote calls a declarative flow needs
#[async_trait]
pub trait TestRunApi: Send + Sync {
    async fn fetch_model(&self, model_id: &str) -> Result<ModelDescriptor, ApiError>;

    async fn create_test_run(
        &self,
        flow: &FlowDefinition,
        provider: Option<&str>,
        provider_key: &str,
    ) -> Result<TestRunResponse, ApiError>;
}

#[async_trait]
impl TestRunApi for OkareoClient {
    async fn fetch_model(&self, model_id: &str) -> Result<ModelDescriptor, ApiError> {
        OkareoClient::fetch_model(self, model_id).await
    }

    async fn create_test_run(
        &self,
        flow: &FlowDefinition,
        provider: Option<&str>,
        provider_key: &str,
    ) -> Result<TestRunResponse, ApiError> {
        OkareoClient::create_test_run(self, flow, provider, provider_key).await
    }
}
