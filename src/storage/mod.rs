pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

pub use s3::S3Storage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object storage is not configured")]
    NotConfigured,

    #[error("Invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Upload failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Blob store that keeps uploaded files and hands back their public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError>;
}

/// Used when no bucket is configured; every upload fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStorage;

#[async_trait]
impl ObjectStorage for DisabledStorage {
    async fn upload(&self, _key: &str, _data: Bytes, _content_type: &str) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured)
    }
}

/// S3 when bucket, region and credentials are all present, otherwise
/// [`DisabledStorage`].
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match S3Storage::from_config(config) {
        Ok(s3) => Ok(Arc::new(s3)),
        Err(StorageError::NotConfigured) => {
            tracing::warn!("Object storage not configured, avatar uploads are disabled");
            Ok(Arc::new(DisabledStorage))
        }
        Err(e) => Err(e),
    }
}

/// Fresh object key for an avatar, keeping the original file extension.
pub fn avatar_key(extension: Option<&str>) -> String {
    format!("avatars/{}{}", Uuid::new_v4(), extension.unwrap_or(""))
}
