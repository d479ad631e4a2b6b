//! CSV publication to object storage
//!
//! [`Publisher`] is the only stage that handles its own failures: a missing
//! local file or missing/rejected credentials turn into `Ok(false)` with a
//! printed diagnostic, while any other store failure is returned as an error.

use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

pub mod s3;

pub use s3::S3Store;

/// Default destination bucket
pub const DEFAULT_BUCKET: &str = "audit-stock-market";

/// Default destination object key
pub const DEFAULT_OBJECT_KEY: &str = "steel_eye_etl.csv";

/// Default S3 region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Publish errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Local file to upload does not exist
    #[error("file not found: {0}")]
    NotFound(String),

    /// Credentials absent or rejected by the store
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Any other store failure
    #[error("upload error: {0}")]
    Upload(String),
}

/// Result type for publish operations
pub type PublishResult<T> = Result<T, PublishError>;

/// Access key pair for the object store
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

impl StoreCredentials {
    /// Create a credential pair
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.access_key_id.trim().is_empty() && !self.secret_access_key.trim().is_empty()
    }
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Credential pair; `None` fails every publish with a credentials error
    pub credentials: Option<StoreCredentials>,
    /// Destination bucket
    pub bucket: String,
    /// Destination object key
    pub object_key: String,
    /// Store region
    pub region: String,
    /// Custom endpoint for S3-compatible stores
    pub endpoint_url: Option<String>,
}

impl PublisherConfig {
    /// Configuration for `bucket`/`object_key` without credentials
    pub fn new(bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            credentials: None,
            bucket: bucket.into(),
            object_key: object_key.into(),
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
        }
    }

    /// Set the credential pair
    pub fn with_credentials(mut self, credentials: StoreCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set a custom endpoint
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Read configuration from the process environment
    ///
    /// `ACCESS_KEY`, `SECRET_KEY`, `BUCKET`, `OBJECT_KEY`, `AWS_REGION`, `S3_ENDPOINT`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = match (non_empty("ACCESS_KEY"), non_empty("SECRET_KEY")) {
            (Some(access), Some(secret)) => Some(StoreCredentials::new(access, secret)),
            _ => None,
        };

        Self {
            credentials,
            bucket: non_empty("BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            object_key: non_empty("OBJECT_KEY").unwrap_or_else(|| DEFAULT_OBJECT_KEY.to_string()),
            region: non_empty("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: non_empty("S3_ENDPOINT"),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET, DEFAULT_OBJECT_KEY)
    }
}

/// Destination for published files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the full contents of `path` to `bucket`/`key`, replacing any existing object
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> PublishResult<()>;
}

/// Uploads the CSV output to the configured bucket
pub struct Publisher {
    config: PublisherConfig,
    store: Option<Box<dyn ObjectStore>>,
}

impl Publisher {
    /// Publisher backed by S3, built from `config` at publish time
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Publisher backed by a custom store
    pub fn with_store(config: PublisherConfig, store: Box<dyn ObjectStore>) -> Self {
        Self {
            config,
            store: Some(store),
        }
    }

    /// Publisher configuration
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Upload `path`, reporting known failure kinds as `Ok(false)`
    ///
    /// # Errors
    /// Only [`PublishError::Upload`] is returned; not-found and credential
    /// failures are printed and reported as `false`.
    pub async fn publish(&self, path: &Path) -> PublishResult<bool> {
        match self.try_publish(path).await {
            Ok(()) => {
                println!("Upload Successful");
                Ok(true)
            }
            Err(PublishError::NotFound(detail)) => {
                warn!("Upload skipped, file not found: {}", detail);
                println!("The file was not found");
                Ok(false)
            }
            Err(PublishError::Credentials(detail)) => {
                warn!("Upload skipped, credentials unavailable: {}", detail);
                println!("Credentials not available");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Upload `path`, returning every failure as an error
    pub async fn try_publish(&self, path: &Path) -> PublishResult<()> {
        if !path.is_file() {
            return Err(PublishError::NotFound(path.display().to_string()));
        }

        let credentials = self
            .config
            .credentials
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or_else(|| {
                PublishError::Credentials("ACCESS_KEY/SECRET_KEY not set".to_string())
            })?;

        info!(
            "Uploading {} to {}/{}",
            path.display(),
            self.config.bucket,
            self.config.object_key
        );

        match &self.store {
            Some(store) => {
                store
                    .put_file(&self.config.bucket, &self.config.object_key, path)
                    .await
            }
            None => {
                S3Store::new(credentials, &self.config)
                    .put_file(&self.config.bucket, &self.config.object_key, path)
                    .await
            }
        }
    }
}
