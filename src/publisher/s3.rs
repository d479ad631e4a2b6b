//! S3 object store

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::debug;

use super::{ObjectStore, PublishError, PublishResult, PublisherConfig, StoreCredentials};

/// Error codes S3 returns for unknown or mis-signed keys
const CREDENTIAL_ERROR_CODES: [&str; 4] = [
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "InvalidToken",
    "ExpiredToken",
];

/// S3 (or S3-compatible) store using a static credential pair
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from explicit credentials and the publisher configuration
    pub fn new(credentials: &StoreCredentials, config: &PublisherConfig) -> Self {
        let credentials = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
            None,
            "firds-etl",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> PublishResult<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| PublishError::NotFound(format!("{}: {e}", path.display())))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| match e.code() {
                Some(code) if CREDENTIAL_ERROR_CODES.contains(&code) => {
                    PublishError::Credentials(format!("{code}: {}", e.message().unwrap_or_default()))
                }
                _ => PublishError::Upload(DisplayErrorContext(&e).to_string()),
            })?;

        debug!("PutObject {}/{} succeeded", bucket, key);
        Ok(())
    }
}
