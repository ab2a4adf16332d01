//! [`QuantumResource`] implementation for Pasqal Cloud.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use alsvid_qrmi::{
    Payload, QrmiResult, QuantumResource, ResourceType, Target, TaskId, TaskResult, TaskStatus,
};

use crate::api::{BatchStatus, DEFAULT_ENDPOINT, PasqalClient};
use crate::error::{PasqalError, PasqalResult};

/// How long to cache device specs before refreshing from the API.
const DEVICE_SPECS_TTL: Duration = Duration::from_secs(5 * 60);

/// A neutral-atom device reached through Pasqal Cloud.
///
/// The service has no lease concept, so `acquire` issues a locally
/// generated token and `release` is a no-op. The resource name doubles
/// as the device type sent with each batch.
#[derive(Debug)]
pub struct PasqalResource {
    name: String,
    client: PasqalClient,
    /// Cached device specs with fetch timestamp for TTL-based refresh.
    specs: Mutex<Option<(serde_json::Value, Instant)>>,
}

fn required(name: &str, key: &str) -> PasqalResult<String> {
    let full = format!("{name}_{key}");
    std::env::var(&full).map_err(|_| PasqalError::MissingEnv(full))
}

fn optional(name: &str, key: &str) -> Option<String> {
    std::env::var(format!("{name}_{key}")).ok()
}

fn map_batch_status(status: BatchStatus) -> TaskStatus {
    match status {
        BatchStatus::Pending | BatchStatus::Paused => TaskStatus::Queued,
        BatchStatus::Running => TaskStatus::Running,
        BatchStatus::Done => TaskStatus::Completed,
        BatchStatus::Canceled => TaskStatus::Cancelled,
        BatchStatus::TimedOut | BatchStatus::Error => TaskStatus::Failed,
    }
}

impl PasqalResource {
    /// Construct from `{name}_`-prefixed environment variables.
    pub fn from_env(name: &str) -> PasqalResult<Self> {
        let endpoint = optional(name, "QRMI_PASQAL_CLOUD_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let project_id = required(name, "QRMI_PASQAL_CLOUD_PROJECT_ID")?;
        let token = required(name, "QRMI_PASQAL_CLOUD_AUTH_TOKEN")?;

        let client = PasqalClient::new(endpoint, &token, project_id)?;
        Ok(Self {
            name: name.to_string(),
            client,
            specs: Mutex::new(None),
        })
    }

    /// Construct with explicit credentials, bypassing the environment.
    pub fn with_credentials(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        token: &str,
        project_id: impl Into<String>,
    ) -> PasqalResult<Self> {
        let client = PasqalClient::new(endpoint, token, project_id)?;
        Ok(Self {
            name: name.into(),
            client,
            specs: Mutex::new(None),
        })
    }

    /// Fetch and cache the device specs, refreshing if stale.
    async fn fetch_specs(&self) -> PasqalResult<serde_json::Value> {
        {
            let cache = self.specs.lock().await;
            if let Some((ref specs, fetched_at)) = *cache {
                if fetched_at.elapsed() < DEVICE_SPECS_TTL {
                    return Ok(specs.clone());
                }
            }
        }

        let specs = self.client.get_device_specs().await?;
        {
            let mut cache = self.specs.lock().await;
            *cache = Some((specs.clone(), Instant::now()));
        }

        Ok(specs)
    }
}

#[async_trait]
impl QuantumResource for PasqalResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::PasqalCloud
    }

    async fn is_accessible(&self) -> QrmiResult<bool> {
        // the account probe fails fast on a bad or expired token
        Ok(self.client.get_auth_info().await.is_ok())
    }

    async fn acquire(&mut self) -> QrmiResult<String> {
        // no lease concept on the service side, the token is local
        Ok(Uuid::new_v4().to_string())
    }

    async fn release(&mut self, _token: &str) -> QrmiResult<()> {
        Ok(())
    }

    async fn target(&self) -> QrmiResult<Target> {
        let specs = self.fetch_specs().await?;
        Ok(Target {
            value: specs.to_string(),
        })
    }

    async fn task_start(&mut self, payload: Payload) -> QrmiResult<TaskId> {
        let task_id = self.run(payload).await?;
        Ok(task_id)
    }

    async fn task_stop(&mut self, task_id: &TaskId) -> QrmiResult<()> {
        let batch = self.client.get_batch(&task_id.0).await?;
        if !batch.status.is_terminal() {
            self.client.cancel_batch(&task_id.0).await?;
        }
        Ok(())
    }

    async fn task_status(&self, task_id: &TaskId) -> QrmiResult<TaskStatus> {
        let batch = self.client.get_batch(&task_id.0).await?;
        Ok(map_batch_status(batch.status))
    }

    async fn task_result(&self, task_id: &TaskId) -> QrmiResult<TaskResult> {
        let result = self.fetch_result(task_id).await?;
        Ok(result)
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("device_name".to_string(), self.name.clone());
        metadata
    }
}

impl PasqalResource {
    async fn run(&mut self, payload: Payload) -> PasqalResult<TaskId> {
        let Payload::PulserSequence { sequence, job_runs } = payload else {
            return Err(PasqalError::UnsupportedPayload(
                "Pasqal Cloud runs Pulser sequences only".to_string(),
            ));
        };

        let batch = self
            .client
            .create_batch(&self.name, &sequence, job_runs)
            .await?;
        info!("Created batch {} on '{}'", batch.id, self.name);
        Ok(TaskId::new(batch.id))
    }

    async fn fetch_result(&self, task_id: &TaskId) -> PasqalResult<TaskResult> {
        let batch = self.client.get_batch(&task_id.0).await?;
        let reason = match batch.status {
            BatchStatus::Done => {
                // the batch document carries the per-job results
                let value = serde_json::to_string(&batch)?;
                return Ok(TaskResult { value });
            }
            BatchStatus::Canceled => "batch was canceled",
            BatchStatus::TimedOut => "batch timed out",
            BatchStatus::Error => "batch failed",
            _ => "batch has not finished",
        };
        Err(PasqalError::ResultUnavailable {
            task_id: task_id.0.clone(),
            reason: reason.to_string(),
        })
    }
}
