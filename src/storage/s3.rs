use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use axum::body::Bytes;
use url::Url;

use super::{ObjectStorage, StorageError};
use crate::config::StorageConfig;

const CREDENTIALS_PROVIDER: &str = "recruit-api";
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Avatar uploads through the AWS SDK. Attempts are counted here rather than
/// by the SDK so every failed try is logged.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<Url>,
    max_attempts: u32,
}

impl S3Storage {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let (Some(bucket), Some(region), Some(access_key_id), Some(secret_access_key)) = (
            config.bucket.clone(),
            config.region.clone(),
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
        ) else {
            return Err(StorageError::NotConfigured);
        };

        let endpoint = config
            .endpoint
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|e| StorageError::InvalidEndpoint(format!("{}: {}", raw, e))))
            .transpose()?;

        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, CREDENTIALS_PROVIDER);
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &endpoint {
            builder = builder
                .endpoint_url(endpoint.as_str().trim_end_matches('/'))
                .force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket,
            region,
            endpoint,
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Public URL of `key`: virtual-hosted on AWS, path-style against a
    /// custom endpoint.
    pub fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        let (mut url, bucket_segment) = match &self.endpoint {
            Some(endpoint) => (endpoint.clone(), Some(self.bucket.as_str())),
            None => {
                let host = format!("https://{}.s3.{}.amazonaws.com/", self.bucket, self.region);
                (Url::parse(&host).map_err(|e| StorageError::InvalidEndpoint(e.to_string()))?, None)
            }
        };

        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidEndpoint(base))?
            .pop_if_empty()
            .extend(bucket_segment)
            .extend(key.split('/'));
        Ok(url)
    }

    async fn put_once(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::Request(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        let url = self.object_url(key)?;
        let mut last = String::new();

        for attempt in 1..=self.max_attempts {
            match self.put_once(key, data.clone(), content_type).await {
                Ok(()) => {
                    tracing::debug!("Uploaded {} ({} bytes)", key, data.len());
                    return Ok(url.to_string());
                }
                Err(e) => {
                    tracing::error!("Upload attempt {}/{} for {} failed: {}", attempt, self.max_attempts, key, e);
                    last = e.to_string();
                    if attempt < self.max_attempts {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(StorageError::Exhausted {
            attempts: self.max_attempts,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StorageConfig {
        StorageConfig {
            bucket: Some("recruit-assets".into()),
            region: Some("ap-southeast-1".into()),
            access_key_id: Some("AKIDEXAMPLE".into()),
            secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into()),
            endpoint: None,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn requires_complete_configuration() {
        let mut partial = config();
        partial.secret_access_key = None;
        assert!(matches!(S3Storage::from_config(&partial), Err(StorageError::NotConfigured)));
    }

    #[tokio::test]
    async fn builds_virtual_hosted_and_path_style_urls() {
        let storage = S3Storage::from_config(&config()).unwrap();
        assert_eq!(
            storage.object_url("avatars/a b.png").unwrap().as_str(),
            "https://recruit-assets.s3.ap-southeast-1.amazonaws.com/avatars/a%20b.png"
        );

        let mut custom = config();
        custom.endpoint = Some("http://localhost:9000/".into());
        let storage = S3Storage::from_config(&custom).unwrap();
        assert_eq!(
            storage.object_url("avatars/x.jpg").unwrap().as_str(),
            "http://localhost:9000/recruit-assets/avatars/x.jpg"
        );
    }

    #[tokio::test]
    async fn rejects_bad_endpoint() {
        let mut custom = config();
        custom.endpoint = Some("not a url".into());
        assert!(matches!(S3Storage::from_config(&custom), Err(StorageError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let mut unreachable = config();
        unreachable.endpoint = Some("http://127.0.0.1:1".into());
        unreachable.max_attempts = 2;
        let storage = S3Storage::from_config(&unreachable).unwrap();

        let result = storage
            .upload("avatars/x.png", Bytes::from_static(b"png"), "image/png")
            .await;
        assert!(matches!(result, Err(StorageError::Exhausted { attempts: 2, .. })));
    }
}
