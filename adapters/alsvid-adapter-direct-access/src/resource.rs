//! [`QuantumResource`] implementation for Direct Access.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use alsvid_qrmi::{
    Payload, QrmiResult, QuantumResource, ResourceType, Target, TaskId, TaskResult, TaskStatus,
};

use crate::api::{DaClient, DaJobStatus, ProgramId, DEFAULT_ENDPOINT};
use crate::error::{DaError, DaResult};
use crate::s3::ResultStore;

const INPUT_PREFIX: &str = "input_";
const RESULTS_PREFIX: &str = "results_";
const LOGS_PREFIX: &str = "logs_";

/// A backend reached through a provisioned Direct Access instance.
///
/// Direct Access has no lease concept on the service side, so `acquire`
/// issues a locally-generated token and `release` is a no-op. Exclusivity
/// comes from the site scheduler running one job at a time per instance.
#[derive(Debug)]
pub struct DirectAccessResource {
    name: String,
    client: DaClient,
    store: Option<ResultStore>,
}

fn required(name: &str, key: &str) -> DaResult<String> {
    let full = format!("{name}_{key}");
    std::env::var(&full).map_err(|_| DaError::MissingEnv(full))
}

fn optional(name: &str, key: &str) -> Option<String> {
    std::env::var(format!("{name}_{key}")).ok()
}

impl DirectAccessResource {
    /// Construct from `{name}_`-prefixed environment variables.
    ///
    /// The endpoint defaults to the local deployment URL; IAM settings are
    /// required. The S3 settings are optional as a group: without them the
    /// resource can be acquired and probed, but tasks cannot run.
    pub fn from_env(name: &str) -> DaResult<Self> {
        let endpoint = optional(name, "QRMI_IBM_DA_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let iam_endpoint = required(name, "QRMI_IBM_DA_IAM_ENDPOINT")?;
        let apikey = required(name, "QRMI_IBM_DA_IAM_APIKEY")?;
        let service_crn = required(name, "QRMI_IBM_DA_SERVICE_CRN")?;

        let store = match (
            optional(name, "QRMI_IBM_DA_S3_ENDPOINT"),
            optional(name, "QRMI_IBM_DA_AWS_ACCESS_KEY_ID"),
            optional(name, "QRMI_IBM_DA_AWS_SECRET_ACCESS_KEY"),
            optional(name, "QRMI_IBM_DA_S3_REGION"),
            optional(name, "QRMI_IBM_DA_S3_BUCKET"),
        ) {
            (Some(endpoint), Some(access_key), Some(secret_key), Some(region), Some(bucket)) => {
                Some(ResultStore::new(
                    endpoint, access_key, secret_key, region, bucket,
                ))
            }
            _ => {
                debug!("No object store configured for '{}'", name);
                None
            }
        };

        let client = DaClient::new(endpoint, iam_endpoint, apikey, &service_crn)?;
        Ok(Self {
            name: name.to_string(),
            client,
            store,
        })
    }

    /// Construct with explicit credentials, bypassing the environment.
    pub fn with_credentials(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        iam_endpoint: impl Into<String>,
        apikey: impl Into<String>,
        service_crn: &str,
    ) -> DaResult<Self> {
        let client = DaClient::new(endpoint, iam_endpoint, apikey, service_crn)?;
        Ok(Self {
            name: name.into(),
            client,
            store: None,
        })
    }

    /// Attach an object store for job inputs and results.
    pub fn with_store(mut self, store: ResultStore) -> Self {
        self.store = Some(store);
        self
    }

    fn store(&self) -> DaResult<&ResultStore> {
        self.store
            .as_ref()
            .ok_or_else(|| DaError::Storage("no object store configured".to_string()))
    }

    fn timeout_secs(&self) -> DaResult<u64> {
        let value = required(&self.name, "QRMI_JOB_TIMEOUT_SECONDS")?;
        value.parse::<u64>().map_err(|_| DaError::InvalidEnv {
            key: format!("{}_QRMI_JOB_TIMEOUT_SECONDS", self.name),
            value,
        })
    }
}

#[async_trait]
impl QuantumResource for DirectAccessResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::DirectAccess
    }

    async fn is_accessible(&self) -> QrmiResult<bool> {
        let backend = self.client.get_backend(&self.name).await?;
        Ok(backend.is_online())
    }

    async fn acquire(&mut self) -> QrmiResult<String> {
        // no session concept on the service side, the token is local
        Ok(Uuid::new_v4().to_string())
    }

    async fn release(&mut self, _token: &str) -> QrmiResult<()> {
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
        if job.status == DaJobStatus::Running {
            // best effort, the delete below reaps the record either way
            let _ = self.client.cancel_job(&task_id.0).await;
        }
        self.client.delete_job(&task_id.0).await?;
        Ok(())
    }

    async fn task_status(&self, task_id: &TaskId) -> QrmiResult<TaskStatus> {
        let job = self.client.get_job(&task_id.0).await?;
        Ok(match job.status {
            DaJobStatus::Running => TaskStatus::Running,
            DaJobStatus::Completed => TaskStatus::Completed,
            DaJobStatus::Failed => TaskStatus::Failed,
            DaJobStatus::Cancelled => TaskStatus::Cancelled,
        })
    }

    async fn task_result(&self, task_id: &TaskId) -> QrmiResult<TaskResult> {
        let result = self.fetch_result(task_id).await?;
        Ok(result)
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("backend_name".to_string(), self.name.clone());
        if let Some(store) = &self.store {
            metadata.insert("s3_bucket".to_string(), store.bucket().to_string());
        }
        metadata
    }
}

impl DirectAccessResource {
    async fn run(&mut self, payload: Payload) -> DaResult<TaskId> {
        let timeout_secs = self.timeout_secs()?;

        let Payload::QiskitPrimitive { input, program_id } = payload else {
            return Err(DaError::UnsupportedPayload(
                "Direct Access runs Qiskit primitives only".to_string(),
            ));
        };
        let program_id: ProgramId = program_id
            .parse()
            .map_err(DaError::UnsupportedPayload)?;
        let params: serde_json::Value = serde_json::from_str(&input)?;

        let store = self.store()?;
        let id = Uuid::new_v4().to_string();

        let input_key = format!("{INPUT_PREFIX}{id}.json");
        store.put_object(&input_key, serde_json::to_vec(&params)?).await?;
        let input_url = store.presigned_get(&input_key).await?;
        let results_url = store
            .presigned_put(&format!("{RESULTS_PREFIX}{id}.json"))
            .await?;
        let logs_url = store
            .presigned_put(&format!("{LOGS_PREFIX}{id}.json"))
            .await?;

        let job = json!({
            "id": id,
            "backend": self.name,
            "program_id": program_id.to_string(),
            "log_level": "debug",
            "timeout_secs": timeout_secs,
            "storage": {
                "input": { "presigned_url": input_url, "type": "s3_compatible" },
                "results": { "presigned_url": results_url, "type": "s3_compatible" },
                "logs": { "presigned_url": logs_url, "type": "s3_compatible" },
            }
        });
        self.client.submit_job(&job).await?;

        info!("Started Direct Access job {} on '{}'", id, self.name);
        Ok(TaskId::new(id))
    }

    async fn fetch_result(&self, task_id: &TaskId) -> DaResult<TaskResult> {
        let job = self.client.get_job(&task_id.0).await?;
        match job.status {
            DaJobStatus::Completed => {}
            DaJobStatus::Failed => {
                return Err(DaError::ResultUnavailable {
                    task_id: task_id.0.clone(),
                    reason: format!(
                        "task failed. code: {}, message: {}, solution: {}",
                        job.reason_code.map_or(String::new(), |c| c.to_string()),
                        job.reason_message.unwrap_or_default(),
                        job.reason_solution.unwrap_or_default()
                    ),
                });
            }
            DaJobStatus::Cancelled => {
                return Err(DaError::ResultUnavailable {
                    task_id: task_id.0.clone(),
                    reason: "task was cancelled".to_string(),
                });
            }
            DaJobStatus::Running => {
                return Err(DaError::ResultUnavailable {
                    task_id: task_id.0.clone(),
                    reason: "task is still running".to_string(),
                });
            }
        }

        let store = self.store()?;
        let key = format!("{RESULTS_PREFIX}{}.json", task_id.0);
        let bytes = store.get_object(&key).await?;
        let value = String::from_utf8(bytes)
            .map_err(|e| DaError::Storage(format!("result object {key} is not UTF-8: {e}")))?;
        Ok(TaskResult { value })
    }
}
