//! Object storage for user avatars.
//!
//! Talks to Cloudflare R2 through the S3 API; MinIO stands in during development.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Prefix under which avatar objects live.
pub const AVATAR_PREFIX: &str = "avatars/";
/// Extension used when an upload has none.
const DEFAULT_AVATAR_EXTENSION: &str = "jpg";

/// Write/delete access to an object bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    /// Create a new S3 storage client from configuration.
    pub fn new(config: &StorageSettings) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            config.secret_key.expose_secret(),
            None,
            None,
            "course-admin",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true);

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "Object storage initialized: bucket={}, endpoint={:?}",
            config.bucket, config.endpoint
        );

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete file: {}", e)))?;

        Ok(())
    }
}

/// Build the object key for a new avatar: `avatars/{user_id}/{unix_millis}.{ext}`.
pub fn avatar_key(user_id: i64, original_filename: &str, unix_millis: i64) -> String {
    let extension = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ext.to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .collect::<String>()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_AVATAR_EXTENSION.to_string());

    format!("{}{}/{}.{}", AVATAR_PREFIX, user_id, unix_millis, extension)
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

/// Public URL an object is served from.
pub fn public_url_for(public_base: &str, key: &str) -> String {
    format!("{}{}", with_trailing_slash(public_base), key)
}

/// Recover the object key from a previously issued avatar URL.
///
/// URLs under the public base map to the remainder of the URL. Any other absolute URL
/// only maps to a key when its path lies under `avatars/`.
pub fn extract_key_from_url(public_base: &str, url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    if !public_base.is_empty() {
        if let Some(key) = url.strip_prefix(&with_trailing_slash(public_base)) {
            return Some(key.to_string()).filter(|k| !k.is_empty());
        }
    }

    let parsed = reqwest::Url::parse(url).ok()?;
    let key = parsed.path().trim_start_matches('/');
    key.starts_with(AVATAR_PREFIX).then(|| key.to_string())
}
