//! Pasqal Cloud REST client.
//!
//! Implements the slice of the Pasqal Cloud API this adapter needs: the
//! batches endpoints for submitting Pulser sequences, the device specs
//! listing, and the account probe used for accessibility checks.

use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{PasqalError, PasqalResult};

/// Default Pasqal Cloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://apis.pasqal.cloud";

/// Pasqal Cloud API client for one project.
#[derive(Debug, Clone)]
pub struct PasqalClient {
    /// HTTP client with the bearer token installed.
    client: Client,
    /// API endpoint URL.
    endpoint: String,
    /// Project the batches are created under.
    project_id: String,
}

impl PasqalClient {
    /// Create a client for one project.
    pub fn new(
        endpoint: impl Into<String>,
        token: &str,
        project_id: impl Into<String>,
    ) -> PasqalResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| PasqalError::InvalidCredential("auth token".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            project_id: project_id.into(),
        })
    }

    /// Probe the account endpoint. Succeeds only with a valid token.
    pub async fn get_auth_info(&self) -> PasqalResult<serde_json::Value> {
        let url = format!("{}/account/api/v1/auth/info", self.endpoint);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Fetch the device specifications document.
    pub async fn get_device_specs(&self) -> PasqalResult<serde_json::Value> {
        let url = format!("{}/core-fast/api/v1/devices/specs", self.endpoint);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Submit a Pulser sequence as a batch with one job of `runs` shots.
    pub async fn create_batch(
        &self,
        device_type: &str,
        sequence_builder: &str,
        runs: u32,
    ) -> PasqalResult<Batch> {
        let url = format!("{}/core-fast/api/v1/batches", self.endpoint);
        let body = json!({
            "project_id": self.project_id,
            "device_type": device_type,
            "sequence_builder": sequence_builder,
            "jobs": [{ "runs": runs }],
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let envelope: BatchEnvelope = response.json().await?;
        Ok(envelope.data)
    }

    /// Fetch one batch by id.
    pub async fn get_batch(&self, batch_id: &str) -> PasqalResult<Batch> {
        let url = format!("{}/core-fast/api/v1/batches/{}", self.endpoint, batch_id);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PasqalError::BatchNotFound(batch_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let envelope: BatchEnvelope = response.json().await?;
        Ok(envelope.data)
    }

    /// Request cancellation of a batch.
    pub async fn cancel_batch(&self, batch_id: &str) -> PasqalResult<()> {
        let url = format!(
            "{}/core-fast/api/v1/batches/{}/cancel",
            self.endpoint, batch_id
        );

        let response = self.client.patch(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

async fn api_error(response: reqwest::Response) -> PasqalError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "no body".to_string());
    PasqalError::Api { status, message }
}

// ============================================================================
// Wire types
// ============================================================================

/// Batch lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    Pending,
    Running,
    Done,
    Canceled,
    TimedOut,
    Error,
    Paused,
}

impl BatchStatus {
    /// Whether the batch can still make progress.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Done | BatchStatus::Canceled | BatchStatus::TimedOut | BatchStatus::Error
        )
    }
}

/// Response envelope; the service wraps payloads in a `data` object.
#[derive(Debug, Deserialize)]
struct BatchEnvelope {
    data: Batch,
}

/// A batch as returned by the service.
///
/// Only the fields this adapter reads are typed; everything else the
/// service sends (jobs, results, timestamps) is kept in `extra` so the
/// full document survives re-serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Batch id.
    pub id: String,
    /// Current status.
    pub status: BatchStatus,
    /// Remaining document fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
