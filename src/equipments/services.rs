use super::models::{self as equipments, DeviceViewRow, EquipmentDevice};
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::devices::media::{MediaFile, MediaKind, MediaUploader};
use crate::devices::services::unlink_equipment_everywhere;
use crate::devices::store::RecordStore;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Alias, Expr, Order, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};
use tracing::info;
use uuid::Uuid;

const UNKNOWN: &str = "Unknown";

pub async fn list_equipments(db: &DatabaseConnection) -> BusinessResult<Vec<equipments::Model>> {
    equipments::Entity::find()
        .order_by_asc(equipments::Column::Code)
        .all(db)
        .await
        .map_err(|err| err.to_business_error("equipments"))
}

pub async fn find_equipment(
    db: &DatabaseConnection,
    code: &str,
) -> BusinessResult<equipments::Model> {
    equipments::Entity::find()
        .filter(equipments::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(|err| err.to_business_error("equipment"))?
        .ok_or_else(|| crate::not_found!("Equipment", code))
}

/// Uploads the equipment photo, then inserts the row. The photo is discarded
/// again if the insert fails.
pub async fn create_equipment(
    db: &DatabaseConnection,
    media: &MediaUploader,
    code: &str,
    image: Option<MediaFile>,
) -> BusinessResult<equipments::Model> {
    let code = code.trim();
    if code.is_empty() {
        return Err(crate::validation_error!("code", "code is required"));
    }
    if let Some(image) = &image {
        MediaKind::Image.check(image)?;
    }

    let image_url = match image {
        Some(image) => Some(media.upload(MediaKind::Image, image).await?.url),
        None => None,
    };

    let equipment = equipments::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        image_url: Set(image_url.clone()),
        created_at: Set(chrono::Utc::now()),
    };

    match equipment.insert(db).await {
        Ok(model) => {
            info!(code = %model.code, "Created equipment");
            Ok(model)
        }
        Err(err) => {
            if let Some(url) = &image_url {
                media.discard(url).await;
            }
            Err(match err.to_business_error("equipment") {
                BusinessError::Duplicate { .. } => {
                    crate::duplicate_resource!(format!("Equipment '{code}'"), "code")
                }
                other => other,
            })
        }
    }
}

/// Detaches every device from the equipment, then deletes it and its photo.
pub async fn delete_equipment(
    db: &DatabaseConnection,
    records: &dyn RecordStore,
    media: &MediaUploader,
    code: &str,
) -> BusinessResult<u64> {
    let equipment = find_equipment(db, code).await?;
    let detached = unlink_equipment_everywhere(records, code).await?;

    let image_url = equipment.image_url.clone();
    equipment
        .delete(db)
        .await
        .map_err(|err| err.to_business_error("equipment"))?;
    if let Some(url) = image_url {
        media.discard(&url).await;
    }

    info!(code, detached, "Deleted equipment");
    Ok(detached)
}

/// Rows of `devices_view` for one equipment, devices grouped by type and tag.
pub async fn equipment_devices(
    db: &DatabaseConnection,
    code: &str,
) -> BusinessResult<Vec<EquipmentDevice>> {
    find_equipment(db, code).await?;

    let mut query = Query::select();
    query
        .columns(
            [
                "device_type",
                "id",
                "tag",
                "type",
                "location",
                "status",
                "image_url",
            ]
            .map(Alias::new),
        )
        .from(Alias::new("devices_view"))
        .and_where(Expr::col(Alias::new("equipment_code")).eq(code))
        .order_by(Alias::new("device_type"), Order::Asc)
        .order_by(Alias::new("tag"), Order::Asc)
        .order_by(Alias::new("sort_order"), Order::Asc);

    let statement = db.get_database_backend().build(&query);
    let rows = db
        .query_all(statement)
        .await
        .map_err(|err| err.to_business_error("devices_view"))?
        .iter()
        .map(DeviceViewRow::from_result)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| err.to_business_error("devices_view"))?;

    Ok(group_devices(rows))
}

/// Folds view rows into one entry per `(device_type, tag)`, in first-seen
/// order, with each image URL listed once.
pub fn group_devices(rows: Vec<DeviceViewRow>) -> Vec<EquipmentDevice> {
    let mut grouped: Vec<EquipmentDevice> = Vec::new();

    for row in rows {
        let tag = row.tag.clone().unwrap_or_else(|| row.id.clone());
        let index = grouped
            .iter()
            .position(|device| device.device_type == row.device_type && device.tag == tag);

        let device = if let Some(index) = index {
            &mut grouped[index]
        } else {
            let or_unknown = |value: Option<String>| {
                value
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN.to_string())
            };
            grouped.push(EquipmentDevice {
                device_type: row.device_type.clone(),
                id: row.id.clone(),
                tag,
                device_model: or_unknown(row.device_model.clone()),
                location: or_unknown(row.location.clone()),
                status: or_unknown(row.status.clone()),
                images: Vec::new(),
            });
            let last = grouped.len() - 1;
            &mut grouped[last]
        };

        if let Some(url) = row.image_url {
            if !device.images.contains(&url) {
                device.images.push(url);
            }
        }
    }

    grouped
}
