use super::blob::{BlobStore, UploadError, UploadOptions};
use crate::config::Config;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client as S3Client, config::Region};
use std::sync::Arc;

pub async fn get_client(config: &Config) -> Option<Arc<S3Client>> {
    let endpoint = config.s3_url.as_ref()?;
    let region = Region::new("us-east-1");
    let credentials = Credentials::new(
        config.s3_access_key.clone().unwrap_or_default(),
        config.s3_secret_key.clone().unwrap_or_default(),
        None,
        None,
        "manual",
    );
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .credentials_provider(credentials)
        .endpoint_url(endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
        .force_path_style(true)
        .build();

    Some(Arc::new(S3Client::from_conf(s3_config)))
}

/// S3-compatible store. Logical buckets become key prefixes inside the
/// configured physical bucket.
pub struct S3BlobStore {
    client: Arc<S3Client>,
    physical_bucket: String,
    key_prefix: String,
}

impl S3BlobStore {
    pub fn new(client: Arc<S3Client>, config: &Config) -> Self {
        Self {
            client,
            physical_bucket: config.s3_physical_bucket(),
            key_prefix: config.s3_key_prefix(),
        }
    }

    fn key(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.key_prefix)
    }

    async fn exists(&self, key: &str) -> Result<bool, String> {
        match self
            .client
            .head_object()
            .bucket(&self.physical_bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(aws_sdk_s3::operation::head_object::HeadObjectError::is_not_found)
                {
                    Ok(false)
                } else {
                    Err(err.to_string())
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<String, UploadError> {
        let key = self.key(bucket, path);

        if !options.upsert {
            let exists = self.exists(&key).await.map_err(|message| UploadError::Transport {
                path: path.to_string(),
                message,
            })?;
            if exists {
                return Err(UploadError::AlreadyExists {
                    path: path.to_string(),
                });
            }
        }

        self.client
            .put_object()
            .bucket(&self.physical_bucket)
            .key(&key)
            .content_type(&options.content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| UploadError::Transport {
                path: path.to_string(),
                message: format!("Failed to upload object to S3: {err}"),
            })?;

        Ok(path.to_string())
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), UploadError> {
        self.client
            .delete_object()
            .bucket(&self.physical_bucket)
            .key(self.key(bucket, path))
            .send()
            .await
            .map_err(|err| UploadError::Transport {
                path: path.to_string(),
                message: format!("Failed to delete object from S3: {err}"),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::media::MediaUploader;
    use crate::external::blob::MemoryBlobStore;

    fn offline_client() -> Arc<S3Client> {
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("https://s3.example.org")
            .force_path_style(true)
            .build();
        Arc::new(S3Client::from_conf(s3_config))
    }

    fn s3_config() -> Config {
        let mut config = Config::for_tests();
        config.s3_url = Some("https://s3.example.org/".to_string());
        config.s3_bucket_id = Some("plant-bucket".to_string());
        config
    }

    #[test]
    fn test_public_url_addresses_stored_object() {
        let mut config = s3_config();
        config.storage_public_url = config.s3_public_base().unwrap();

        let store = S3BlobStore::new(offline_client(), &config);
        let media = MediaUploader::new(
            Arc::new(MemoryBlobStore::default()),
            &config.media_bucket,
            &config.storage_public_url,
        );

        let object_url = format!(
            "https://s3.example.org/{}/{}",
            store.physical_bucket,
            store.key(&config.media_bucket, "images/abc.jpg")
        );
        assert_eq!(media.public_url("images/abc.jpg"), object_url);
        assert_eq!(
            object_url,
            "https://s3.example.org/plant-bucket/instrument-api-test/test/media/images/abc.jpg"
        );
    }

    #[test]
    fn test_physical_bucket_falls_back_to_media_bucket() {
        let mut config = s3_config();
        config.s3_bucket_id = None;

        assert_eq!(config.s3_physical_bucket(), "media");
        assert_eq!(
            config.s3_public_base().as_deref(),
            Some("https://s3.example.org/media/instrument-api-test/test")
        );
        assert_eq!(Config::for_tests().s3_public_base(), None);
    }
}
