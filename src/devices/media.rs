use crate::common::errors::BusinessResult;
use crate::external::blob::{BlobStore, UploadError, UploadOptions};
use crate::validation_error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "heic"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi", "m4v", "3gp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn folder(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    fn default_extension(self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    fn known_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }

    fn top_level(self) -> mime::Name<'static> {
        match self {
            MediaKind::Image => mime::IMAGE,
            MediaKind::Video => mime::VIDEO,
        }
    }

    fn form_field(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "video",
        }
    }

    /// Rejects files whose declared type, or extension when the type is
    /// generic, does not belong to this kind.
    pub fn check(self, file: &MediaFile) -> BusinessResult<()> {
        if file.bytes.is_empty() {
            return Err(validation_error!(
                self.form_field(),
                format!("'{}' is empty", file.file_name)
            ));
        }

        let declared = file.content_type.parse::<mime::Mime>().ok();
        let matches = match declared {
            Some(ref declared) if *declared != mime::APPLICATION_OCTET_STREAM => {
                declared.type_() == self.top_level()
            }
            _ => file
                .extension()
                .is_some_and(|ext| self.known_extensions().contains(&ext.as_str())),
        };

        if matches {
            Ok(())
        } else {
            Err(validation_error!(
                self.form_field(),
                format!(
                    "'{}' ({}) is not a {} file",
                    file.file_name,
                    file.content_type,
                    self.top_level()
                )
            ))
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub path: String,
    pub url: String,
}

/// Writes media blobs and derives their public URLs.
#[derive(Clone)]
pub struct MediaUploader {
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    public_base: String,
}

impl MediaUploader {
    pub fn new(blobs: Arc<dyn BlobStore>, bucket: &str, public_base: &str) -> Self {
        Self {
            blobs,
            bucket: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_state(state: &crate::common::state::AppState) -> Self {
        Self::new(
            state.blobs.clone(),
            &state.config.media_bucket,
            &state.config.storage_public_url,
        )
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, self.bucket, path)
    }

    /// Inverse of [`Self::public_url`] for URLs this uploader produced.
    pub fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base)?
            .strip_prefix('/')?
            .strip_prefix(&self.bucket)?
            .strip_prefix('/')
            .filter(|path| !path.is_empty())
            .map(ToString::to_string)
    }

    /// `<folder>/<fresh uuid>.<ext>`; every file gets its own name.
    pub fn new_path(kind: MediaKind, file: &MediaFile) -> String {
        let extension = file
            .extension()
            .filter(|ext| kind.known_extensions().contains(&ext.as_str()))
            .unwrap_or_else(|| kind.default_extension().to_string());
        format!("{}/{}.{}", kind.folder(), Uuid::new_v4(), extension)
    }

    pub async fn upload(
        &self,
        kind: MediaKind,
        file: MediaFile,
    ) -> Result<UploadedMedia, UploadError> {
        let path = Self::new_path(kind, &file);
        let content_type = if file.content_type.is_empty() {
            mime::APPLICATION_OCTET_STREAM.to_string()
        } else {
            file.content_type
        };
        self.upload_at(&path, file.bytes, &content_type, true).await
    }

    pub async fn upload_at(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<UploadedMedia, UploadError> {
        let size = bytes.len();
        let options = UploadOptions {
            content_type: content_type.to_string(),
            upsert,
        };
        let stored = self
            .blobs
            .upload(&self.bucket, path, bytes, &options)
            .await?;
        debug!(path = %stored, size, "Stored media object");

        Ok(UploadedMedia {
            url: self.public_url(&stored),
            path: stored,
        })
    }

    /// Best-effort removal used to compensate for a later failed step.
    pub async fn discard(&self, url: &str) {
        let Some(path) = self.path_from_url(url) else {
            warn!(url, "Not discarding media outside the configured bucket");
            return;
        };
        match self.blobs.remove(&self.bucket, &path).await {
            Ok(()) => debug!(path = %path, "Discarded media object"),
            Err(err) => warn!(path = %path, error = %err, "Failed to discard media object"),
        }
    }
}
