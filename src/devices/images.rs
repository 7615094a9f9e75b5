use super::schema::DeviceKind;
use super::store::{Column, ColumnKind, Filter, RecordStore, Row};
use crate::common::errors::{BusinessResult, DbErrorExt};
use futures::stream::{self, StreamExt};
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// Concurrent link inserts per save.
pub const LINK_CONCURRENCY: usize = 4;

const IMAGE_COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Integer),
    Column::new("device_id", ColumnKind::Text),
    Column::new("url", ColumnKind::Text),
    Column::new("sort_order", ColumnKind::Integer),
    Column::new("created_at", ColumnKind::Text),
];

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct DeviceImage {
    pub id: i32,
    pub url: String,
    pub sort_order: i32,
    pub created_at: String,
    /// The main display image: lowest `sort_order`, then lowest id.
    pub is_primary: bool,
}

/// An image selected for linking, in the user's selection order.
#[derive(Debug, Clone)]
pub struct PendingLink {
    pub file_name: String,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Debug)]
pub struct LinkOutcome {
    pub link: PendingLink,
    pub result: Result<(), DbErr>,
}

fn image_from_row(row: &Row) -> DeviceImage {
    let integer = |name: &str| {
        row.get(name)
            .and_then(Value::as_i64)
            .and_then(|value| i32::try_from(value).ok())
            .unwrap_or_default()
    };
    let text = |name: &str| {
        row.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    DeviceImage {
        id: integer("id"),
        url: text("url"),
        sort_order: integer("sort_order"),
        created_at: text("created_at"),
        is_primary: false,
    }
}

/// Inserts one `<kind>_images` row per pending link, concurrently. Each
/// insert settles on its own; no failure undoes a sibling or the device.
pub async fn link_images(
    records: &dyn RecordStore,
    kind: DeviceKind,
    device_id: &str,
    links: Vec<PendingLink>,
) -> Vec<LinkOutcome> {
    stream::iter(links.into_iter().map(|link| async move {
        let mut row = Row::new();
        row.insert("device_id".to_string(), Value::from(device_id));
        row.insert("url".to_string(), Value::from(link.url.as_str()));
        row.insert("sort_order".to_string(), Value::from(link.sort_order));
        row.insert(
            "created_at".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );

        let result = records.insert(kind.images_table(), row).await;
        match &result {
            Ok(()) => debug!(device_id, url = %link.url, "Linked image"),
            Err(err) => warn!(device_id, url = %link.url, error = %err, "Failed to link image"),
        }
        LinkOutcome { link, result }
    }))
    .buffer_unordered(LINK_CONCURRENCY)
    .collect()
    .await
}

/// Images of one device, main image first.
pub async fn list_images(
    records: &dyn RecordStore,
    kind: DeviceKind,
    device_id: &str,
) -> BusinessResult<Vec<DeviceImage>> {
    let rows = records
        .select(
            kind.images_table(),
            IMAGE_COLUMNS,
            Some(&Filter::eq("device_id", device_id)),
            &["sort_order", "id"],
        )
        .await
        .map_err(|err| err.to_business_error("device_image"))?;

    let mut images: Vec<DeviceImage> = rows.iter().map(image_from_row).collect();
    if let Some(first) = images.first_mut() {
        first.is_primary = true;
    }
    Ok(images)
}

/// Main image URL per device id, for list pages.
pub async fn main_images(
    records: &dyn RecordStore,
    kind: DeviceKind,
) -> BusinessResult<std::collections::HashMap<String, String>> {
    let rows = records
        .select(
            kind.images_table(),
            IMAGE_COLUMNS,
            None,
            &["device_id", "sort_order", "id"],
        )
        .await
        .map_err(|err| err.to_business_error("device_image"))?;

    let mut main = std::collections::HashMap::new();
    for row in &rows {
        let device_id = row
            .get("device_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        main.entry(device_id)
            .or_insert_with(|| image_from_row(row).url);
    }
    Ok(main)
}

/// Sort order that places a new image after every existing one.
pub async fn next_sort_order(
    records: &dyn RecordStore,
    kind: DeviceKind,
    device_id: &str,
) -> BusinessResult<i32> {
    Ok(list_images(records, kind, device_id)
        .await?
        .iter()
        .map(|image| image.sort_order + 1)
        .max()
        .unwrap_or(0))
}

/// Removes the link rows for `url`; returns whether any row matched.
pub async fn unlink_image(
    records: &dyn RecordStore,
    kind: DeviceKind,
    device_id: &str,
    url: &str,
) -> BusinessResult<bool> {
    let removed = records
        .delete(
            kind.images_table(),
            &Filter::eq("device_id", device_id).and("url", url),
        )
        .await
        .map_err(|err| err.to_business_error("device_image"))?;
    Ok(removed > 0)
}

pub async fn unlink_all(
    records: &dyn RecordStore,
    kind: DeviceKind,
    device_id: &str,
) -> BusinessResult<u64> {
    records
        .delete(kind.images_table(), &Filter::eq("device_id", device_id))
        .await
        .map_err(|err| err.to_business_error("device_image"))
}
