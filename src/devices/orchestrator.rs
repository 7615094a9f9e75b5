//! Device save workflow.
//!
//! A save walks `Idle → Validating → UploadingVideo → InsertingDevice →
//! UploadingImages → LinkingImages → Done`, or stops in `Failed`. The store
//! offers no transaction spanning blobs and rows, so each step that can
//! orphan a blob compensates for it:
//!
//! * the video is uploaded before the row and is fatal on failure;
//! * a failed row write discards the freshly uploaded video;
//! * an image whose link insert fails has its blob discarded.
//!
//! Image failures do not fail the save. They are reported per file in the
//! [`SaveReport`], and [`SaveOrchestrator::attach_images`] retries them
//! against the existing device.

use super::images::{self, DeviceImage, LinkOutcome, PendingLink};
use super::media::{MediaFile, MediaKind, MediaUploader};
use super::schema::DeviceKind;
use super::store::{self, RecordStore};
use super::validation::{DeviceDraft, DraftMode, validate_draft, validate_media};
use crate::common::errors::{BusinessError, DbErrorExt};
use axum::Json;
use axum::response::{IntoResponse, Response};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Concurrent image uploads per save.
pub const UPLOAD_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SaveStage {
    Idle,
    Validating,
    UploadingVideo,
    InsertingDevice,
    UploadingImages,
    LinkingImages,
    Done,
    Failed,
}

/// Everything submitted with one save.
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub draft: DeviceDraft,
    pub images: Vec<MediaFile>,
    pub videos: Vec<MediaFile>,
    /// URLs of existing images to unlink (edits only).
    pub remove_images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MediaFailure {
    pub file_name: String,
    pub stage: SaveStage,
    pub message: String,
}

/// Outcome of a save that reached `Done`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaveReport {
    pub device_id: String,
    pub kind: DeviceKind,
    pub stage: SaveStage,
    pub stages: Vec<SaveStage>,
    pub video: Option<String>,
    /// Images linked by this save, in `sort_order`.
    pub images: Vec<DeviceImage>,
    pub removed_images: Vec<String>,
    /// Files that were selected but did not end up linked.
    pub failures: Vec<MediaFailure>,
}

/// A save that stopped in `Failed`; `stage` is where it stopped.
#[derive(Debug)]
pub struct SaveFailure {
    pub stage: SaveStage,
    pub stages: Vec<SaveStage>,
    pub error: BusinessError,
}

impl IntoResponse for SaveFailure {
    fn into_response(self) -> Response {
        let mut body = self.error.to_json();
        if let Some(error) = body.get_mut("error").and_then(Value::as_object_mut) {
            error.insert(
                "stage".to_string(),
                serde_json::to_value(self.stage).unwrap_or(Value::Null),
            );
        }
        (self.error.status_code(), Json(body)).into_response()
    }
}

pub struct SaveOrchestrator {
    records: Arc<dyn RecordStore>,
    media: MediaUploader,
    kind: DeviceKind,
    stages: Vec<SaveStage>,
}

impl SaveOrchestrator {
    pub fn new(records: Arc<dyn RecordStore>, media: MediaUploader, kind: DeviceKind) -> Self {
        Self {
            records,
            media,
            kind,
            stages: vec![SaveStage::Idle],
        }
    }

    pub fn from_state(state: &crate::common::state::AppState, kind: DeviceKind) -> Self {
        Self::new(
            state.records.clone(),
            MediaUploader::from_state(state),
            kind,
        )
    }

    fn current(&self) -> SaveStage {
        self.stages.last().copied().unwrap_or(SaveStage::Idle)
    }

    fn enter(&mut self, stage: SaveStage, device_id: &str) {
        debug!(kind = %self.kind, device_id, from = ?self.current(), to = ?stage, "Save stage");
        self.stages.push(stage);
    }

    fn fail(&mut self, device_id: &str, error: BusinessError) -> SaveFailure {
        let stage = self.current();
        warn!(kind = %self.kind, device_id, stage = ?stage, error = %error, "Save failed");
        self.stages.push(SaveStage::Failed);
        SaveFailure {
            stage,
            stages: self.stages.clone(),
            error,
        }
    }

    fn finish(
        &mut self,
        device_id: String,
        video: Option<String>,
        images: Vec<DeviceImage>,
        removed_images: Vec<String>,
        failures: Vec<MediaFailure>,
    ) -> SaveReport {
        self.stages.push(SaveStage::Done);
        info!(
            kind = %self.kind,
            device_id = %device_id,
            linked = images.len(),
            failed = failures.len(),
            "Save done"
        );
        SaveReport {
            device_id,
            kind: self.kind,
            stage: SaveStage::Done,
            stages: self.stages.clone(),
            video,
            images,
            removed_images,
            failures,
        }
    }

    /// Creates a device with its video and images.
    pub async fn create(mut self, request: SaveRequest) -> Result<SaveReport, SaveFailure> {
        let schema = self.kind.schema();
        let draft_id = request.draft.get("id").unwrap_or_default().trim().to_string();

        self.enter(SaveStage::Validating, &draft_id);
        let mut row = validate_draft(schema, &request.draft, DraftMode::Create)
            .map_err(|err| self.fail(&draft_id, err))?;
        validate_media(schema, &request.images, &request.videos, DraftMode::Create)
            .map_err(|err| self.fail(&draft_id, err))?;
        let device_id = draft_id;

        let mut video_url = None;
        if let Some(video) = request.videos.into_iter().next() {
            self.enter(SaveStage::UploadingVideo, &device_id);
            let uploaded = self
                .media
                .upload(MediaKind::Video, video)
                .await
                .map_err(|err| self.fail(&device_id, err.into()))?;
            row.insert("video".to_string(), Value::from(uploaded.url.as_str()));
            video_url = Some(uploaded.url);
        }

        self.enter(SaveStage::InsertingDevice, &device_id);
        if let Err(err) = store::insert_device(self.records.as_ref(), self.kind, row).await {
            if let Some(url) = &video_url {
                self.media.discard(url).await;
            }
            let err = match err {
                BusinessError::Duplicate { .. } => crate::duplicate_resource!(
                    format!("Device '{device_id}'"),
                    "id"
                ),
                other => other,
            };
            return Err(self.fail(&device_id, err));
        }

        let (linked, failures) = self.upload_and_link(&device_id, request.images, 0).await;
        Ok(self.finish(device_id, video_url, linked, Vec::new(), failures))
    }

    /// Edits an existing device. Only submitted fields change; a submitted
    /// video replaces the old one; `remove_images` are unlinked before new
    /// images are appended after the current last one.
    pub async fn update(
        mut self,
        device_id: &str,
        request: SaveRequest,
    ) -> Result<SaveReport, SaveFailure> {
        let schema = self.kind.schema();

        self.enter(SaveStage::Validating, device_id);
        let mut row = validate_draft(schema, &request.draft, DraftMode::Update { id: device_id })
            .map_err(|err| self.fail(device_id, err))?;
        validate_media(
            schema,
            &request.images,
            &request.videos,
            DraftMode::Update { id: device_id },
        )
        .map_err(|err| self.fail(device_id, err))?;
        let existing = store::find_device(self.records.as_ref(), self.kind, device_id)
            .await
            .map_err(|err| self.fail(device_id, err))?;
        let old_video = existing
            .get("video")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let mut video_url = old_video.clone();
        let mut new_video = None;
        if let Some(video) = request.videos.into_iter().next() {
            self.enter(SaveStage::UploadingVideo, device_id);
            let uploaded = self
                .media
                .upload(MediaKind::Video, video)
                .await
                .map_err(|err| self.fail(device_id, err.into()))?;
            row.insert("video".to_string(), Value::from(uploaded.url.as_str()));
            new_video = Some(uploaded.url.clone());
            video_url = Some(uploaded.url);
        }

        self.enter(SaveStage::InsertingDevice, device_id);
        if let Err(err) =
            store::update_device(self.records.as_ref(), self.kind, device_id, row).await
        {
            if let Some(url) = &new_video {
                self.media.discard(url).await;
            }
            return Err(self.fail(device_id, err));
        }
        if let (Some(_), Some(old)) = (&new_video, &old_video) {
            self.media.discard(old).await;
        }

        let mut failures = Vec::new();
        let mut removed = Vec::new();
        for url in request.remove_images {
            match images::unlink_image(self.records.as_ref(), self.kind, device_id, &url).await {
                Ok(true) => {
                    self.media.discard(&url).await;
                    removed.push(url);
                }
                Ok(false) => failures.push(MediaFailure {
                    file_name: url,
                    stage: SaveStage::LinkingImages,
                    message: "image is not linked to this device".to_string(),
                }),
                Err(err) => failures.push(MediaFailure {
                    file_name: url,
                    stage: SaveStage::LinkingImages,
                    message: err.to_string(),
                }),
            }
        }

        let start = images::next_sort_order(self.records.as_ref(), self.kind, device_id)
            .await
            .map_err(|err| self.fail(device_id, err))?;
        let (linked, link_failures) = self.upload_and_link(device_id, request.images, start).await;
        failures.extend(link_failures);

        Ok(self.finish(
            device_id.to_string(),
            video_url,
            linked,
            removed,
            failures,
        ))
    }

    /// Uploads and links further images to an existing device. Retrying the
    /// files listed in a report's failures resumes an interrupted save.
    pub async fn attach_images(
        mut self,
        device_id: &str,
        files: Vec<MediaFile>,
    ) -> Result<SaveReport, SaveFailure> {
        self.enter(SaveStage::Validating, device_id);
        if files.is_empty() {
            return Err(self.fail(
                device_id,
                crate::validation_error!("images", "at least one image is required"),
            ));
        }
        for file in &files {
            MediaKind::Image
                .check(file)
                .map_err(|err| self.fail(device_id, err))?;
        }
        let existing = store::find_device(self.records.as_ref(), self.kind, device_id)
            .await
            .map_err(|err| self.fail(device_id, err))?;
        let video = existing
            .get("video")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let start = images::next_sort_order(self.records.as_ref(), self.kind, device_id)
            .await
            .map_err(|err| self.fail(device_id, err))?;
        let (linked, failures) = self.upload_and_link(device_id, files, start).await;
        Ok(self.finish(device_id.to_string(), video, linked, Vec::new(), failures))
    }

    /// Deletes a device, its image rows and, best-effort, its blobs.
    pub async fn delete(self, device_id: &str) -> Result<(), BusinessError> {
        let records = self.records.as_ref();
        let existing = store::find_device(records, self.kind, device_id).await?;
        let linked = images::list_images(records, self.kind, device_id).await?;

        images::unlink_all(records, self.kind, device_id).await?;
        let removed = records
            .delete(
                self.kind.table(),
                &store::Filter::eq("id", device_id),
            )
            .await
            .map_err(|err| err.to_business_error(self.kind.singular()))?;
        if removed == 0 {
            return Err(crate::not_found!(self.kind.singular(), device_id));
        }

        if let Some(video) = existing.get("video").and_then(Value::as_str) {
            self.media.discard(video).await;
        }
        for image in &linked {
            self.media.discard(&image.url).await;
        }
        info!(kind = %self.kind, device_id, images = linked.len(), "Deleted device");
        Ok(())
    }

    /// Stages 4 and 5: concurrent uploads, then concurrent link inserts for
    /// the uploads that succeeded. `start` is the sort order of the first
    /// selected file.
    async fn upload_and_link(
        &mut self,
        device_id: &str,
        files: Vec<MediaFile>,
        start: i32,
    ) -> (Vec<DeviceImage>, Vec<MediaFailure>) {
        let mut failures = Vec::new();
        if files.is_empty() {
            return (Vec::new(), failures);
        }

        self.enter(SaveStage::UploadingImages, device_id);
        let media = &self.media;
        let uploads = stream::iter(files.into_iter().enumerate().map(|(index, file)| {
            async move {
                let file_name = file.file_name.clone();
                (index, file_name, media.upload(MediaKind::Image, file).await)
            }
        }))
        .buffer_unordered(UPLOAD_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

        let mut pending = Vec::new();
        for (index, file_name, result) in uploads {
            match result {
                Ok(uploaded) => pending.push(PendingLink {
                    file_name,
                    url: uploaded.url,
                    sort_order: start.saturating_add(i32::try_from(index).unwrap_or(i32::MAX)),
                }),
                Err(err) => {
                    warn!(device_id, file_name = %file_name, error = %err, "Image upload failed");
                    failures.push(MediaFailure {
                        file_name,
                        stage: SaveStage::UploadingImages,
                        message: err.to_string(),
                    });
                }
            }
        }

        if pending.is_empty() {
            return (Vec::new(), failures);
        }

        self.enter(SaveStage::LinkingImages, device_id);
        let outcomes =
            images::link_images(self.records.as_ref(), self.kind, device_id, pending).await;

        let mut linked = Vec::new();
        for LinkOutcome { link, result } in outcomes {
            match result {
                Ok(()) => linked.push(DeviceImage {
                    id: 0,
                    url: link.url,
                    sort_order: link.sort_order,
                    created_at: String::new(),
                    is_primary: false,
                }),
                Err(err) => {
                    self.media.discard(&link.url).await;
                    failures.push(MediaFailure {
                        file_name: link.file_name,
                        stage: SaveStage::LinkingImages,
                        message: err.to_string(),
                    });
                }
            }
        }

        // Rows carry generated ids and timestamps; report them as stored.
        if let Ok(stored) = images::list_images(self.records.as_ref(), self.kind, device_id).await {
            linked = stored
                .into_iter()
                .filter(|image| linked.iter().any(|new| new.url == image.url))
                .collect();
        } else {
            linked.sort_by_key(|image| image.sort_order);
        }

        (linked, failures)
    }
}
