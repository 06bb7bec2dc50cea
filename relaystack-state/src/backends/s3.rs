//! S3 backend for state storage
//!
//! Remote state for shared operation: the state file and its lock object
//! live side by side under the configured key. Objects are written with
//! SSE-AES256; the bucket is bootstrapped on `init` with versioning enabled
//! and public access blocked.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketVersioningStatus, PublicAccessBlockConfiguration, ServerSideEncryption,
    VersioningConfiguration,
};
use tracing::info;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

/// S3-based state backend
pub struct S3Backend {
    client: Client,
    bucket: String,
    key: String,
    region: String,
}

impl S3Backend {
    /// Create a new S3Backend from configuration. Requires `bucket`, `key`,
    /// and `region` attributes.
    pub async fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let bucket = config.require("bucket")?.to_string();
        let key = config.require("key")?.to_string();
        let region = config.require("region")?.to_string();

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region.clone()))
            .load()
            .await;

        Ok(Self {
            client: Client::new(&aws_config),
            bucket,
            key,
            region,
        })
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    /// The lock object key (state key + ".lock")
    fn lock_key(&self) -> String {
        format!("{}.lock", self.key)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> BackendResult<Option<T>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| BackendError::Io(e.to_string()))?;
                let value = serde_json::from_slice(&body.into_bytes())
                    .map_err(|e| BackendError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Err(err) => {
                if is_not_found_error(&err) {
                    Ok(None)
                } else {
                    Err(BackendError::Aws(err.to_string()))
                }
            }
        }
    }

    async fn put_json<T: serde::Serialize>(&self, key: &str, value: &T) -> BackendResult<()> {
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| BackendError::Serialization(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await
            .map_err(|e| BackendError::Aws(e.to_string()))?;

        Ok(())
    }

    async fn delete_lock(&self) -> BackendResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.lock_key())
            .send()
            .await
            .map_err(|e| BackendError::Aws(e.to_string()))?;

        Ok(())
    }

    async fn bucket_exists(&self) -> BackendResult<bool> {
        let result = self.client.head_bucket().bucket(&self.bucket).send().await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                // HeadBucket reports a missing bucket as a plain 404.
                if err.as_service_error().is_some()
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404)
                {
                    Ok(false)
                } else {
                    Err(BackendError::Aws(err.to_string()))
                }
            }
        }
    }

    async fn create_bucket(&self) -> BackendResult<()> {
        let mut create_request = self.client.create_bucket().bucket(&self.bucket);

        if self.region != "us-east-1" {
            use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};

            let constraint = BucketLocationConstraint::from(self.region.as_str());
            let bucket_config = CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build();
            create_request = create_request.create_bucket_configuration(bucket_config);
        }

        create_request
            .send()
            .await
            .map_err(|e| BackendError::Aws(format!("Failed to create bucket: {}", e)))?;

        // Versioning keeps state history recoverable.
        let versioning = VersioningConfiguration::builder()
            .status(BucketVersioningStatus::Enabled)
            .build();
        self.client
            .put_bucket_versioning()
            .bucket(&self.bucket)
            .versioning_configuration(versioning)
            .send()
            .await
            .map_err(|e| BackendError::Aws(format!("Failed to enable versioning: {}", e)))?;

        let public_access_block = PublicAccessBlockConfiguration::builder()
            .block_public_acls(true)
            .block_public_policy(true)
            .ignore_public_acls(true)
            .restrict_public_buckets(true)
            .build();
        self.client
            .put_public_access_block()
            .bucket(&self.bucket)
            .public_access_block_configuration(public_access_block)
            .send()
            .await
            .map_err(|e| BackendError::Aws(format!("Failed to block public access: {}", e)))?;

        info!(bucket = %self.bucket, region = %self.region, "state bucket created");
        Ok(())
    }
}

#[async_trait]
impl StateBackend for S3Backend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        self.get_json(&self.key).await
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(existing) = self.read_state().await?
            && existing.lineage != state.lineage
        {
            return Err(BackendError::LineageMismatch {
                expected: existing.lineage,
                actual: state.lineage.clone(),
            });
        }

        self.put_json(&self.key, state).await
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        if let Some(existing_lock) = self.get_json::<LockInfo>(&self.lock_key()).await? {
            if existing_lock.is_expired() {
                self.delete_lock().await?;
            } else {
                return Err(BackendError::locked(&existing_lock));
            }
        }

        let lock = LockInfo::new(operation);
        self.put_json(&self.lock_key(), &lock).await?;

        // Read back and confirm it is ours; another writer may have raced us.
        match self.get_json::<LockInfo>(&self.lock_key()).await? {
            Some(written_lock) if written_lock.id == lock.id => Ok(lock),
            Some(written_lock) => Err(BackendError::locked(&written_lock)),
            None => Ok(lock),
        }
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing_lock = self
            .get_json::<LockInfo>(&self.lock_key())
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;

        if existing_lock.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing_lock.id,
            });
        }

        self.delete_lock().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        let existing_lock = self
            .get_json::<LockInfo>(&self.lock_key())
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock_id.to_string()))?;

        if existing_lock.id != lock_id {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing_lock.id,
            });
        }

        self.delete_lock().await
    }

    async fn init(&self) -> BackendResult<()> {
        if !self.bucket_exists().await? {
            self.create_bucket().await?;
        }

        if self.read_state().await?.is_none() {
            self.write_state(&StateFile::new()).await?;
        }

        Ok(())
    }
}

/// Check if an S3 error is a "not found" error
fn is_not_found_error<E: std::fmt::Debug>(err: &aws_sdk_s3::error::SdkError<E>) -> bool {
    err.raw_response()
        .is_some_and(|raw| raw.status().as_u16() == 404)
}
