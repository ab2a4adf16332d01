//! Direct Access REST API client.
//!
//! Implements the slice of the Direct Access API this adapter needs:
//! IAM token exchange, backend introspection, and the job lifecycle
//! (submit with presigned storage URLs, poll, cancel, delete).

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use reqwest::{header, Client};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{DaError, DaResult};

/// Default Direct Access endpoint for on-site deployments.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Refresh the bearer token this long before IAM says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Direct Access API client with cached IAM authentication.
pub struct DaClient {
    client: Client,
    endpoint: String,
    iam_endpoint: String,
    apikey: String,
    token_cache: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

impl fmt::Debug for DaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaClient")
            .field("endpoint", &self.endpoint)
            .field("iam_endpoint", &self.iam_endpoint)
            .field("apikey", &"[REDACTED]")
            .finish()
    }
}

/// IAM token response from the identity service.
#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl DaClient {
    /// Create a client for one service instance.
    ///
    /// The Service-CRN identifies the provisioned instance and is sent
    /// with every request; the bearer token is fetched lazily and cached
    /// until shortly before expiry.
    pub fn new(
        endpoint: impl Into<String>,
        iam_endpoint: impl Into<String>,
        apikey: impl Into<String>,
        service_crn: &str,
    ) -> DaResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::HeaderName::from_static("service-crn"),
            header::HeaderValue::from_str(service_crn)
                .map_err(|_| DaError::InvalidCredential("Service-CRN".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            iam_endpoint: iam_endpoint.into(),
            apikey: apikey.into(),
            token_cache: Mutex::new(None),
        })
    }

    /// Bearer token for the next request, exchanging the API key if the
    /// cached one is gone or stale.
    async fn bearer(&self) -> DaResult<String> {
        {
            let cache = self.token_cache.lock().await;
            if let Some(cached) = cache.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.bearer.clone());
                }
            }
        }

        let response = self
            .client
            .post(format!("{}/identity/token", self.iam_endpoint))
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.apikey.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DaError::IamTokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(DaError::IamTokenExchange(format!(
                "IAM returned {status}: {body}"
            )));
        }

        let token: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| DaError::IamTokenExchange(format!("failed to parse IAM response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN);
        debug!("Exchanged IAM API key, token valid for {:?}", lifetime);

        let bearer = token.access_token.clone();
        *self.token_cache.lock().await = Some(CachedToken {
            bearer: token.access_token,
            expires_at,
        });
        Ok(bearer)
    }

    /// Fetch one backend by name.
    pub async fn get_backend(&self, name: &str) -> DaResult<BackendResponse> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/backends/{}", self.endpoint, name);

        let response = self.client.get(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Fetch the backend configuration document.
    pub async fn get_backend_configuration(&self, name: &str) -> DaResult<serde_json::Value> {
        self.get_json(&format!("{}/v1/backends/{}/configuration", self.endpoint, name))
            .await
    }

    /// Fetch the backend properties document.
    pub async fn get_backend_properties(&self, name: &str) -> DaResult<serde_json::Value> {
        self.get_json(&format!("{}/v1/backends/{}/properties", self.endpoint, name))
            .await
    }

    async fn get_json(&self, url: &str) -> DaResult<serde_json::Value> {
        let bearer = self.bearer().await?;
        let response = self.client.get(url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Submit a job document built by the caller.
    pub async fn submit_job(&self, job: &serde_json::Value) -> DaResult<()> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs", self.endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(job)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Look up one job.
    ///
    /// The service only exposes a list endpoint, so this fetches the list
    /// and filters by id.
    pub async fn get_job(&self, job_id: &str) -> DaResult<JobData> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs", self.endpoint);

        let response = self.client.get(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let jobs: JobsResponse = response.json().await?;
        jobs.jobs
            .into_iter()
            .find(|job| job.id == job_id)
            .ok_or_else(|| DaError::JobNotFound(job_id.to_string()))
    }

    /// Request cancellation of a running job.
    pub async fn cancel_job(&self, job_id: &str) -> DaResult<()> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs/{}/cancel", self.endpoint, job_id);

        let response = self.client.post(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Delete a job record from the service.
    pub async fn delete_job(&self, job_id: &str) -> DaResult<()> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs/{}", self.endpoint, job_id);

        let response = self.client.delete(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

async fn api_error(response: reqwest::Response) -> DaError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "no body".to_string());
    DaError::Api { status, message }
}

// ============================================================================
// Wire types
// ============================================================================

/// Primitive program selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramId {
    Sampler,
    Estimator,
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProgramId::Sampler => "sampler",
            ProgramId::Estimator => "estimator",
        })
    }
}

impl FromStr for ProgramId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sampler" => Ok(ProgramId::Sampler),
            "estimator" => Ok(ProgramId::Estimator),
            other => Err(format!("unknown program id: {other}")),
        }
    }
}

/// Backend description from `/v1/backends/{name}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendResponse {
    /// Backend name.
    pub name: String,
    /// Status string ("online", "offline", "paused").
    pub status: String,
    /// Optional status detail.
    #[serde(default)]
    pub message: Option<String>,
}

impl BackendResponse {
    /// Whether jobs can run right now.
    pub fn is_online(&self) -> bool {
        self.status.eq_ignore_ascii_case("online")
    }
}

/// Job list response from `/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobsResponse {
    /// All jobs visible to this instance.
    #[serde(default)]
    pub jobs: Vec<JobData>,
}

/// One job record.
#[derive(Debug, Clone, Deserialize)]
pub struct JobData {
    /// Job id (caller-generated UUID).
    pub id: String,
    /// Current status.
    pub status: DaJobStatus,
    /// Failure code, when failed.
    #[serde(default)]
    pub reason_code: Option<u64>,
    /// Failure message, when failed.
    #[serde(default)]
    pub reason_message: Option<String>,
    /// Suggested remedy, when failed.
    #[serde(default)]
    pub reason_solution: Option<String>,
}

/// Direct Access job states. The service has no queued state; accepted
/// jobs start immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaJobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}
