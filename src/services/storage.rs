use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};

use crate::core::config::Settings;
use crate::core::metrics;
use crate::core::time::primitive_now_utc;

#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let s3 = settings.s3();
        if s3.access_key.is_empty() || s3.secret_key.is_empty() || s3.endpoint.is_empty() {
            return Ok(None);
        }

        let creds = Credentials::new(
            s3.access_key.clone(),
            s3.secret_key.clone(),
            None,
            None,
            "nexus4d-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(s3.endpoint.clone())
            .region(aws_config::Region::new(s3.region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let client = Client::new(&config);
        let public_base_url = if s3.public_base_url.is_empty() {
            format!("{}/{}", s3.endpoint.trim_end_matches('/'), s3.bucket)
        } else {
            s3.public_base_url.clone()
        };

        Ok(Some(Self { client, bucket: s3.bucket.clone(), public_base_url }))
    }

    /// Stores `bytes` under `folder` and returns the public URL of the object.
    pub(crate) async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<String> {
        let key = object_key(folder, filename, &bytes, primitive_now_utc().assume_utc().unix_timestamp());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        tracing::debug!(bucket = %self.bucket, key = %key, "Object uploaded");
        Ok(public_url(&self.public_base_url, &key))
    }

    /// Deletes an object previously returned by [`upload`](Self::upload). URLs that do
    /// not point into this bucket are ignored and reported as `false`.
    pub(crate) async fn delete(&self, url: &str) -> anyhow::Result<bool> {
        let Some(key) = key_from_url(&self.public_base_url, url) else {
            return Ok(false);
        };

        self.client.delete_object().bucket(&self.bucket).key(key).send().await?;
        Ok(true)
    }
}

/// Deletes a stored object after the owning record is gone. Failures are logged and
/// counted, never returned.
pub(crate) async fn discard(storage: Option<&StorageService>, url: &str) {
    let Some(storage) = storage else {
        return;
    };
    if let Err(err) = storage.delete(url).await {
        metrics::side_effect_failed("storage_delete");
        tracing::warn!(error = %err, url, "Failed to delete stored object");
    }
}

fn object_key(folder: &str, filename: &str, bytes: &[u8], timestamp: i64) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|ch| ch.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());

    format!("{}/{}-{}.{}", folder.trim_matches('/'), timestamp, &digest[..16], extension)
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

fn key_from_url<'a>(base: &str, url: &'a str) -> Option<&'a str> {
    let prefix = format!("{}/", base.trim_end_matches('/'));
    url.strip_prefix(prefix.as_str()).filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_uses_folder_timestamp_and_extension() {
        let key = object_key("receipts", "Payment.JPG", b"receipt", 1_700_000_000);
        assert!(key.starts_with("receipts/1700000000-"));
        assert!(key.ends_with(".jpg"));
        assert_eq!(key.len(), "receipts/1700000000-".len() + 16 + ".jpg".len());
    }

    #[test]
    fn object_key_falls_back_to_bin() {
        assert!(object_key("/materials/", "noext", b"x", 1).ends_with(".bin"));
        assert!(object_key("materials", "bad.ex e", b"x", 1).ends_with(".bin"));
        assert!(object_key("/materials/", "noext", b"x", 1).starts_with("materials/"));
    }

    #[test]
    fn key_round_trips_through_public_url() {
        let base = "https://cdn.nexus4d.com/";
        let url = public_url(base, "receipts/1-abc.png");
        assert_eq!(url, "https://cdn.nexus4d.com/receipts/1-abc.png");
        assert_eq!(key_from_url(base, &url), Some("receipts/1-abc.png"));
    }

    #[test]
    fn foreign_urls_are_not_deleted() {
        let base = "https://cdn.nexus4d.com";
        assert_eq!(key_from_url(base, "https://youtube.com/watch?v=1"), None);
        assert_eq!(key_from_url(base, "COUPON_FREE"), None);
        assert_eq!(key_from_url(base, "https://cdn.nexus4d.com/"), None);
    }
}
