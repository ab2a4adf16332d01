//! S3-compatible object store for job inputs and results.
//!
//! Direct Access never streams payloads through its own API. The caller
//! uploads the primitive input to a bucket, hands the service presigned
//! URLs for input, results and logs, and fetches the result object after
//! completion. Works against any S3-compatible store (IBM COS, MinIO).

use std::time::Duration;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;

use crate::error::{DaError, DaResult};

/// How long presigned URLs handed to the service stay valid.
const PRESIGN_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Object-store client bound to one bucket.
#[derive(Debug, Clone)]
pub struct ResultStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl ResultStore {
    /// Build a store from static credentials and an explicit endpoint.
    ///
    /// Path-style addressing is forced; virtual-host addressing does not
    /// work against MinIO and most on-prem stores.
    pub fn new(
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id.into(),
            secret_access_key.into(),
            None,
            None,
            "alsvid-direct-access",
        );

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint.into())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket: bucket.into(),
        }
    }

    /// The bucket this store reads and writes.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload one object.
    pub async fn put_object(&self, key: &str, body: Vec<u8>) -> DaResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .map_err(|e| DaError::Storage(format!("put {}: {}", key, DisplayErrorContext(&e))))?;
        Ok(())
    }

    /// Download one object.
    pub async fn get_object(&self, key: &str) -> DaResult<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| DaError::Storage(format!("get {}: {}", key, DisplayErrorContext(&e))))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| DaError::Storage(format!("read {}: {}", key, e)))?;
        Ok(data.into_bytes().to_vec())
    }

    /// Presigned GET URL for the service to read an object.
    pub async fn presigned_get(&self, key: &str) -> DaResult<String> {
        let config = PresigningConfig::expires_in(PRESIGN_EXPIRY)
            .map_err(|e| DaError::Storage(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| {
                DaError::Storage(format!("presign get {}: {}", key, DisplayErrorContext(&e)))
            })?;
        Ok(presigned.uri().to_string())
    }

    /// Presigned PUT URL for the service to write an object.
    pub async fn presigned_put(&self, key: &str) -> DaResult<String> {
        let config = PresigningConfig::expires_in(PRESIGN_EXPIRY)
            .map_err(|e| DaError::Storage(e.to_string()))?;
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| {
                DaError::Storage(format!("presign put {}: {}", key, DisplayErrorContext(&e)))
            })?;
        Ok(presigned.uri().to_string())
    }
}
