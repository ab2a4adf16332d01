//! [`QuantumResource`] implementation for the Qiskit Runtime Service.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use alsvid_qrmi::{
    Payload, QrmiError, QrmiResult, QuantumResource, ResourceType, Target, TaskId, TaskResult,
    TaskStatus,
};

use crate::api::{DEFAULT_ENDPOINT, JobResponse, QrsClient};
use crate::error::{QrsError, QrsResult};

/// Session mode used when the environment does not set one.
pub const DEFAULT_SESSION_MODE: &str = "dedicated";

/// Session TTL in seconds used when the environment does not set one.
pub const DEFAULT_SESSION_TTL: u64 = 28800;

/// A backend leased through a Runtime Service session.
///
/// `acquire` opens a session and hands its id back as the token; `release`
/// closes that session. The scheduler plugin publishes the token into the
/// job environment, so tasks started inside the allocation attach to the
/// same session.
#[derive(Debug)]
pub struct RuntimeServiceResource {
    name: String,
    client: QrsClient,
    session_mode: String,
    session_ttl: u64,
}

fn required(name: &str, key: &str) -> QrsResult<String> {
    let full = format!("{name}_{key}");
    std::env::var(&full).map_err(|_| QrsError::MissingEnv(full))
}

fn optional(name: &str, key: &str) -> Option<String> {
    std::env::var(format!("{name}_{key}")).ok()
}

fn primitive_program_id(raw: &str) -> QrsResult<String> {
    let id = raw.to_ascii_lowercase();
    match id.as_str() {
        "sampler" | "estimator" => Ok(id),
        _ => Err(QrsError::UnsupportedPayload(format!(
            "unknown program id: {raw}"
        ))),
    }
}

fn map_status(job: &JobResponse) -> TaskStatus {
    if job.is_completed() {
        TaskStatus::Completed
    } else if job.is_failed() {
        TaskStatus::Failed
    } else if job.is_cancelled() {
        TaskStatus::Cancelled
    } else if job.is_running() {
        TaskStatus::Running
    } else {
        // queued, or a transient state this adapter does not know
        TaskStatus::Queued
    }
}

impl RuntimeServiceResource {
    /// Construct from `{name}_`-prefixed environment variables.
    ///
    /// IAM settings are required; endpoint, session mode and session TTL
    /// fall back to defaults.
    pub fn from_env(name: &str) -> QrsResult<Self> {
        let endpoint = optional(name, "QRMI_IBM_QRS_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let iam_endpoint = required(name, "QRMI_IBM_QRS_IAM_ENDPOINT")?;
        let apikey = required(name, "QRMI_IBM_QRS_IAM_APIKEY")?;
        let service_crn = required(name, "QRMI_IBM_QRS_SERVICE_CRN")?;

        let session_mode = optional(name, "QRMI_IBM_QRS_SESSION_MODE")
            .unwrap_or_else(|| DEFAULT_SESSION_MODE.to_string());
        let session_ttl = match optional(name, "QRMI_IBM_QRS_SESSION_TTL") {
            Some(value) => value.parse::<u64>().map_err(|_| QrsError::InvalidEnv {
                key: format!("{name}_QRMI_IBM_QRS_SESSION_TTL"),
                value,
            })?,
            None => DEFAULT_SESSION_TTL,
        };

        let client = QrsClient::new(endpoint, iam_endpoint, apikey, &service_crn)?;
        Ok(Self {
            name: name.to_string(),
            client,
            session_mode,
            session_ttl,
        })
    }

    /// Construct with explicit credentials, bypassing the environment.
    /// Session settings start at the defaults.
    pub fn with_credentials(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        iam_endpoint: impl Into<String>,
        apikey: impl Into<String>,
        service_crn: &str,
    ) -> QrsResult<Self> {
        let client = QrsClient::new(endpoint, iam_endpoint, apikey, service_crn)?;
        Ok(Self {
            name: name.into(),
            client,
            session_mode: DEFAULT_SESSION_MODE.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
        })
    }

    /// Override the session mode and TTL.
    pub fn with_session(mut self, mode: impl Into<String>, max_ttl: u64) -> Self {
        self.session_mode = mode.into();
        self.session_ttl = max_ttl;
        self
    }

    fn timeout_secs(&self) -> QrsResult<Option<u64>> {
        let Some(value) = optional(&self.name, "QRMI_JOB_TIMEOUT_SECONDS") else {
            return Ok(None);
        };
        value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| QrsError::InvalidEnv {
                key: format!("{}_QRMI_JOB_TIMEOUT_SECONDS", self.name),
                value,
            })
    }
}

#[async_trait]
impl QuantumResource for RuntimeServiceResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::QiskitRuntimeService
    }

    async fn is_accessible(&self) -> QrmiResult<bool> {
        let status = self.client.backend_status(&self.name).await?;
        Ok(status.state)
    }

    async fn acquire(&mut self) -> QrmiResult<String> {
        let session = self
            .client
            .create_session(&self.session_mode, self.session_ttl)
            .await
            .map_err(|e| QrmiError::AcquisitionFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;
        info!("Opened session {} on '{}'", session.session_id, self.name);
        Ok(session.session_id)
    }

    async fn release(&mut self, token: &str) -> QrmiResult<()> {
        self.client
            .close_session(token)
            .await
            .map_err(|e| QrmiError::ReleaseFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;
        info!("Closed session {} on '{}'", token, self.name);
        Ok(())
    }

    async fn target(&self) -> QrmiResult<Target> {
        let mut value = json!({});
        match self.client.get_backend_configuration(&self.name).await {
            Ok(config) => value["configuration"] = config,
            Err(_) => value["configuration"] = json!(null),
        }
        match self.client.get_backend_properties(&self.name).await {
            Ok(props) => value["properties"] = props,
            Err(_) => value["properties"] = json!(null),
        }
        Ok(Target {
            value: value.to_string(),
        })
    }

    async fn task_start(&mut self, payload: Payload) -> QrmiResult<TaskId> {
        let task_id = self.run(payload).await?;
        Ok(task_id)
    }

    async fn task_stop(&mut self, task_id: &TaskId) -> QrmiResult<()> {
        let job = self.client.get_job(&task_id.0).await?;
        if !job.is_terminal() {
            // queued jobs are cancelled too, then the record is removed
            let _ = self.client.cancel_job(&task_id.0).await;
        }
        self.client.delete_job(&task_id.0).await?;
        Ok(())
    }

    async fn task_status(&self, task_id: &TaskId) -> QrmiResult<TaskStatus> {
        let job = self.client.get_job(&task_id.0).await?;
        Ok(map_status(&job))
    }

    async fn task_result(&self, task_id: &TaskId) -> QrmiResult<TaskResult> {
        let result = self.fetch_result(task_id).await?;
        Ok(result)
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("backend_name".to_string(), self.name.clone());
        metadata.insert("session_mode".to_string(), self.session_mode.clone());
        metadata
    }
}

impl RuntimeServiceResource {
    async fn run(&mut self, payload: Payload) -> QrsResult<TaskId> {
        let Payload::QiskitPrimitive { input, program_id } = payload else {
            return Err(QrsError::UnsupportedPayload(
                "Runtime Service runs Qiskit primitives only".to_string(),
            ));
        };
        let program_id = primitive_program_id(&program_id)?;
        let params: serde_json::Value = serde_json::from_str(&input)?;

        // attach to the session the scheduler acquired, when there is one
        let session_id = optional(&self.name, "QRMI_JOB_ACQUISITION_TOKEN");
        let cost_secs = self.timeout_secs()?;

        let job_id = self
            .client
            .run_primitive(
                &self.name,
                &program_id,
                &params,
                session_id.as_deref(),
                cost_secs,
            )
            .await?;
        info!("Submitted Runtime Service job {} on '{}'", job_id, self.name);
        Ok(TaskId::new(job_id))
    }

    async fn fetch_result(&self, task_id: &TaskId) -> QrsResult<TaskResult> {
        let job = self.client.get_job(&task_id.0).await?;
        if job.is_completed() {
            let value = self.client.get_job_results(&task_id.0).await?;
            return Ok(TaskResult { value });
        }

        let reason = if job.is_failed() {
            match job.error_message() {
                Some(msg) => format!("task failed: {msg}"),
                None => "task failed".to_string(),
            }
        } else if job.is_cancelled() {
            "task was cancelled".to_string()
        } else {
            "task has not finished".to_string()
        };
        Err(QrsError::ResultUnavailable {
            task_id: task_id.0.clone(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_status(status: &str) -> JobResponse {
        serde_json::from_value(json!({
            "id": "cq3kaa0ngg0008h3vc22",
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_from_env_requires_iam_settings() {
        let err = RuntimeServiceResource::from_env("absent_qrs").unwrap_err();
        assert!(matches!(err, QrsError::MissingEnv(key)
            if key == "absent_qrs_QRMI_IBM_QRS_IAM_ENDPOINT"));
    }

    #[test]
    fn test_session_defaults() {
        let resource = RuntimeServiceResource::with_credentials(
            "test_fez",
            "https://quantum.cloud.ibm.com/api",
            "https://iam.cloud.ibm.com",
            "apikey",
            "crn:v1:test",
        )
        .unwrap();
        assert_eq!(resource.session_mode, DEFAULT_SESSION_MODE);
        assert_eq!(resource.session_ttl, DEFAULT_SESSION_TTL);

        let resource = resource.with_session("batch", 600);
        assert_eq!(resource.session_mode, "batch");
        assert_eq!(resource.session_ttl, 600);
    }

    #[test]
    fn test_metadata_includes_session_mode() {
        let resource = RuntimeServiceResource::with_credentials(
            "test_fez",
            "https://quantum.cloud.ibm.com/api",
            "https://iam.cloud.ibm.com",
            "apikey",
            "crn:v1:test",
        )
        .unwrap();
        let metadata = resource.metadata();
        assert_eq!(metadata["backend_name"], "test_fez");
        assert_eq!(metadata["session_mode"], "dedicated");
    }

    #[test]
    fn test_program_id_normalization() {
        assert_eq!(primitive_program_id("Sampler").unwrap(), "sampler");
        assert_eq!(primitive_program_id("estimator").unwrap(), "estimator");
        assert!(matches!(
            primitive_program_id("vqe"),
            Err(QrsError::UnsupportedPayload(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status(&job_with_status("Queued")), TaskStatus::Queued);
        assert_eq!(map_status(&job_with_status("Running")), TaskStatus::Running);
        assert_eq!(
            map_status(&job_with_status("Completed")),
            TaskStatus::Completed
        );
        assert_eq!(
            map_status(&job_with_status("Cancelled")),
            TaskStatus::Cancelled
        );
        assert_eq!(map_status(&job_with_status("Failed")), TaskStatus::Failed);
        // unknown transient states stay pending rather than failing the poll
        assert_eq!(
            map_status(&job_with_status("Validating")),
            TaskStatus::Queued
        );
    }
}
