use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub content_type: String,
    /// Overwrite an existing object instead of failing with `AlreadyExists`.
    pub upsert: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    AlreadyExists { path: String },
    Transport { path: String, message: String },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::AlreadyExists { path } => write!(f, "object '{path}' already exists"),
            UploadError::Transport { path, message } => {
                write!(f, "transfer of '{path}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for UploadError {}

impl From<UploadError> for crate::common::errors::BusinessError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::AlreadyExists { path } => Self::UploadConflict { path },
            UploadError::Transport { path, message } => Self::UploadFailed { path, message },
        }
    }
}

/// Object storage consumed by the media uploader.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at `path` inside `bucket`, returning the stored path.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<String, UploadError>;

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), UploadError>;
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Process-local blob store for tests and S3-less local runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    #[cfg(test)]
    upload_calls: AtomicUsize,
    #[cfg(test)]
    reject_payload: Mutex<Option<Vec<u8>>>,
}

#[cfg(test)]
impl MemoryBlobStore {
    /// Any upload whose bytes equal `payload` fails with a transport error.
    pub fn reject_payload(&self, payload: &[u8]) {
        if let Ok(mut guard) = self.reject_payload.lock() {
            *guard = Some(payload.to_vec());
        }
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, bytes: &[u8]) -> bool {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.reject_payload
            .lock()
            .map(|guard| guard.as_deref() == Some(bytes))
            .unwrap_or(false)
    }

    pub fn get(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .ok()?
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<String, UploadError> {
        #[cfg(test)]
        if self.injected_failure(&bytes) {
            return Err(UploadError::Transport {
                path: path.to_string(),
                message: "connection reset by peer".to_string(),
            });
        }

        let mut objects = self.objects.lock().map_err(|e| UploadError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let key = (bucket.to_string(), path.to_string());
        if !options.upsert && objects.contains_key(&key) {
            return Err(UploadError::AlreadyExists {
                path: path.to_string(),
            });
        }
        objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: options.content_type.clone(),
            },
        );

        Ok(path.to_string())
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), UploadError> {
        let mut objects = self.objects.lock().map_err(|e| UploadError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        objects.remove(&(bucket.to_string(), path.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(upsert: bool) -> UploadOptions {
        UploadOptions {
            content_type: "image/jpeg".to_string(),
            upsert,
        }
    }

    #[tokio::test]
    async fn test_upload_without_upsert_refuses_existing_object() {
        let store = MemoryBlobStore::default();
        store
            .upload("media", "images/a.jpg", vec![1, 2], &options(false))
            .await
            .unwrap();

        let err = store
            .upload("media", "images/a.jpg", vec![3], &options(false))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            UploadError::AlreadyExists {
                path: "images/a.jpg".to_string()
            }
        );
        assert_eq!(store.get("media", "images/a.jpg").unwrap().bytes, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_rejected_payload_is_a_transport_error() {
        let store = MemoryBlobStore::default();
        store.reject_payload(b"corrupt");

        let err = store
            .upload("media", "images/b.jpg", b"corrupt".to_vec(), &options(true))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Transport { .. }));
        assert_eq!(store.upload_calls(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_deletes_object() {
        let store = MemoryBlobStore::default();
        store
            .upload("media", "videos/v.mp4", vec![0], &options(true))
            .await
            .unwrap();
        store.remove("media", "videos/v.mp4").await.unwrap();
        assert!(store.get("media", "videos/v.mp4").is_none());
    }
}
