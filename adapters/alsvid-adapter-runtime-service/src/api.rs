//! Qiskit Runtime Service REST client.
//!
//! Implements the slice of the IBM Quantum Cloud API this adapter needs:
//! - IAM token exchange, with the bearer cached until shortly before expiry
//! - Session open and close
//! - Primitive job submission, status, results and cancellation
//! - Backend status, configuration and properties

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{QrsError, QrsResult};

/// Default IBM Quantum Cloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://quantum.cloud.ibm.com/api";

/// IBM-API-Version header value.
const IBM_API_VERSION: &str = "2026-02-01";

/// Refresh the bearer this long before IAM says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Runtime Service API client for one service instance.
pub struct QrsClient {
    /// HTTP client with the instance headers installed.
    client: Client,
    /// Service API endpoint URL.
    endpoint: String,
    /// IAM identity service URL.
    iam_endpoint: String,
    /// IAM API key, exchanged for bearer tokens.
    apikey: String,
    /// Cached bearer with its refresh deadline.
    token_cache: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for QrsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QrsClient")
            .field("endpoint", &self.endpoint)
            .field("iam_endpoint", &self.iam_endpoint)
            .field("apikey", &"[REDACTED]")
            .finish()
    }
}

struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

/// IAM token response from the identity service.
#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl QrsClient {
    /// Create a client for one provisioned service instance.
    ///
    /// The Service-CRN and IBM-API-Version headers are sent with every
    /// request; the bearer token is exchanged lazily from the API key.
    pub fn new(
        endpoint: impl Into<String>,
        iam_endpoint: impl Into<String>,
        apikey: impl Into<String>,
        service_crn: &str,
    ) -> QrsResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::HeaderName::from_static("service-crn"),
            header::HeaderValue::from_str(service_crn)
                .map_err(|_| QrsError::InvalidCredential("Service-CRN".to_string()))?,
        );
        headers.insert(
            header::HeaderName::from_static("ibm-api-version"),
            header::HeaderValue::from_static(IBM_API_VERSION),
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

    /// Bearer token for the next request, re-exchanging the API key when
    /// the cached one is gone or stale.
    async fn bearer(&self) -> QrsResult<String> {
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
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(format!(
                "grant_type=urn:ibm:params:oauth:grant-type:apikey&apikey={}",
                self.apikey
            ))
            .send()
            .await
            .map_err(|e| QrsError::IamTokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(QrsError::IamTokenExchange(format!(
                "IAM returned {status}: {body}"
            )));
        }

        let token: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| QrsError::IamTokenExchange(format!("failed to parse IAM response: {e}")))?;

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

    /// Fetch the operational status of a backend.
    pub async fn backend_status(&self, name: &str) -> QrsResult<BackendStatusResponse> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/backends/{}/status", self.endpoint, name);

        let response = self.client.get(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Fetch the backend configuration document.
    pub async fn get_backend_configuration(&self, name: &str) -> QrsResult<serde_json::Value> {
        self.get_json(&format!(
            "{}/v1/backends/{}/configuration",
            self.endpoint, name
        ))
        .await
    }

    /// Fetch the backend properties document.
    pub async fn get_backend_properties(&self, name: &str) -> QrsResult<serde_json::Value> {
        self.get_json(&format!("{}/v1/backends/{}/properties", self.endpoint, name))
            .await
    }

    async fn get_json(&self, url: &str) -> QrsResult<serde_json::Value> {
        let bearer = self.bearer().await?;
        let response = self.client.get(url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Open a session on a backend.
    ///
    /// A `204 No Content` answer means the service declined without an
    /// error body, which is surfaced as [`QrsError::SessionRejected`].
    pub async fn create_session(&self, mode: &str, max_ttl: u64) -> QrsResult<SessionResponse> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/sessions", self.endpoint);
        let body = json!({
            "mode": mode,
            "max_ttl": max_ttl,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(QrsError::SessionRejected(
                "no content returned".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Close a session. The service winds down any jobs still attached.
    pub async fn close_session(&self, session_id: &str) -> QrsResult<()> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/sessions/{}", self.endpoint, session_id);

        let response = self.client.delete(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Invoke a Qiskit Runtime primitive and return the job id.
    pub async fn run_primitive(
        &self,
        backend: &str,
        program_id: &str,
        params: &serde_json::Value,
        session_id: Option<&str>,
        cost_secs: Option<u64>,
    ) -> QrsResult<String> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs", self.endpoint);

        let mut body = json!({
            "program_id": program_id,
            "backend": backend,
            "params": params,
        });
        if let Some(session_id) = session_id {
            body["session_id"] = json!(session_id);
        }
        if let Some(cost) = cost_secs {
            body["cost"] = json!(cost);
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let submitted: SubmitResponse = response.json().await?;
        Ok(submitted.id)
    }

    /// Fetch one job by id.
    pub async fn get_job(&self, job_id: &str) -> QrsResult<JobResponse> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs/{}", self.endpoint, job_id);

        let response = self.client.get(&url).bearer_auth(bearer).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(QrsError::JobNotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Fetch the result document of a completed job, as raw JSON text.
    pub async fn get_job_results(&self, job_id: &str) -> QrsResult<String> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs/{}/results", self.endpoint, job_id);

        let response = self.client.get(&url).bearer_auth(bearer).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(QrsError::JobNotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.text().await?)
    }

    /// Request cancellation of a job.
    pub async fn cancel_job(&self, job_id: &str) -> QrsResult<()> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs/{}/cancel", self.endpoint, job_id);

        let response = self.client.post(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Delete a job record from the service.
    pub async fn delete_job(&self, job_id: &str) -> QrsResult<()> {
        let bearer = self.bearer().await?;
        let url = format!("{}/v1/jobs/{}", self.endpoint, job_id);

        let response = self.client.delete(&url).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

/// API error payload, `{"code": ..., "message": ...}` when the service
/// explains itself.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

async fn api_error(response: reqwest::Response) -> QrsError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "no body".to_string());
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(err) if !err.message.is_empty() => match err.code {
            Some(code) => format!("[{code}] {}", err.message),
            None => err.message,
        },
        _ => body,
    };
    QrsError::Api { status, message }
}

// ============================================================================
// Wire types
// ============================================================================

/// Session creation response.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    /// Session id, passed back as the acquisition token.
    pub session_id: String,
}

/// Backend status from `/v1/backends/{name}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendStatusResponse {
    /// Whether the backend is operational.
    pub state: bool,
    /// Status string (e.g. "active").
    #[serde(default)]
    pub status: String,
    /// Status detail.
    #[serde(default)]
    pub message: String,
}

/// Job submission response.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    /// Job id.
    id: String,
}

/// Job details from `/v1/jobs/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    /// Job id.
    pub id: String,
    /// Status string, mixed case on the current API ("Queued", "Running").
    pub status: String,
    /// Backend the job runs on.
    #[serde(default)]
    pub backend: Option<String>,
    /// Session the job belongs to.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// State object with failure reason.
    #[serde(default)]
    pub state: Option<JobState>,
}

/// Job state detail.
#[derive(Debug, Clone, Deserialize)]
pub struct JobState {
    /// Status string.
    #[serde(default)]
    pub status: String,
    /// Reason for failure.
    #[serde(default)]
    pub reason: Option<String>,
    /// Reason code.
    #[serde(default)]
    pub reason_code: Option<u32>,
}

impl JobResponse {
    /// Normalized uppercase status for comparison.
    fn normalized_status(&self) -> String {
        self.status.to_uppercase()
    }

    /// Whether the job is still waiting for execution.
    pub fn is_queued(&self) -> bool {
        self.normalized_status() == "QUEUED"
    }

    /// Whether the job is executing.
    pub fn is_running(&self) -> bool {
        self.normalized_status() == "RUNNING"
    }

    /// Whether the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.normalized_status().as_str(),
            "COMPLETED" | "FAILED" | "CANCELLED" | "ERROR"
        )
    }

    /// Whether the job completed successfully.
    pub fn is_completed(&self) -> bool {
        self.normalized_status() == "COMPLETED"
    }

    /// Whether the job failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.normalized_status().as_str(), "FAILED" | "ERROR")
    }

    /// Whether the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.normalized_status() == "CANCELLED"
    }

    /// Failure reason, when the service reported one.
    pub fn error_message(&self) -> Option<String> {
        self.state.as_ref().and_then(|s| s.reason.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_response_deserialization() {
        let json = r#"{"session_id": "cq3k7ppngg0008h3vc10", "mode": "dedicated"}"#;
        let session: SessionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(session.session_id, "cq3k7ppngg0008h3vc10");
    }

    #[test]
    fn test_backend_status_deserialization() {
        let json = r#"{"state": true, "status": "active", "message": ""}"#;
        let status: BackendStatusResponse = serde_json::from_str(json).unwrap();
        assert!(status.state);
        assert_eq!(status.status, "active");
    }

    #[test]
    fn test_job_response_mixed_case_status() {
        let json = r#"{
            "id": "cq3kaa0ngg0008h3vc20",
            "status": "Failed",
            "backend": "ibm_fez",
            "created": "2026-08-12T09:30:00Z",
            "state": {"status": "Failed", "reason": "circuit too deep", "reason_code": 1513}
        }"#;
        let job: JobResponse = serde_json::from_str(json).unwrap();
        assert!(job.is_terminal());
        assert!(job.is_failed());
        assert!(!job.is_completed());
        assert_eq!(job.error_message().unwrap(), "circuit too deep");
        assert!(job.created.is_some());
    }

    #[test]
    fn test_job_response_queued_is_not_terminal() {
        let json = r#"{"id": "cq3kaa0ngg0008h3vc21", "status": "Queued"}"#;
        let job: JobResponse = serde_json::from_str(json).unwrap();
        assert!(job.is_queued());
        assert!(!job.is_running());
        assert!(!job.is_terminal());
        assert!(job.error_message().is_none());
    }

    #[test]
    fn test_default_endpoint_is_cloud() {
        assert!(DEFAULT_ENDPOINT.contains("quantum.cloud.ibm.com"));
    }
}
