use super::models as calibration;
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::devices::media::{MediaFile, MediaKind, MediaUploader};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct NewCalibration {
    pub name: String,
    pub calibration_type: String,
    pub image: MediaFile,
    pub video: MediaFile,
}

pub async fn list_calibrations(db: &DatabaseConnection) -> BusinessResult<Vec<calibration::Model>> {
    calibration::Entity::find()
        .order_by_desc(calibration::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|err| err.to_business_error("calibrations"))
}

pub async fn find_calibration(
    db: &DatabaseConnection,
    id: Uuid,
) -> BusinessResult<calibration::Model> {
    calibration::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|err| err.to_business_error("calibration"))?
        .ok_or_else(|| crate::not_found!("Calibration", id))
}

/// Uploads the photo and video side by side, then writes the row. Whatever
/// was stored is discarded if a later step fails.
pub async fn create_calibration(
    db: &DatabaseConnection,
    media: &MediaUploader,
    new: NewCalibration,
) -> BusinessResult<calibration::Model> {
    let name = new.name.trim().to_string();
    let calibration_type = new.calibration_type.trim().to_string();
    if name.is_empty() {
        return Err(crate::validation_error!("name", "name is required"));
    }
    if calibration_type.is_empty() {
        return Err(crate::validation_error!("type", "type is required"));
    }
    MediaKind::Image.check(&new.image)?;
    MediaKind::Video.check(&new.video)?;

    let (image, video) = futures::join!(
        media.upload(MediaKind::Image, new.image),
        media.upload(MediaKind::Video, new.video)
    );
    let (image, video) = match (image, video) {
        (Ok(image), Ok(video)) => (image, video),
        (Ok(stored), Err(err)) | (Err(err), Ok(stored)) => {
            warn!(error = %err, "Calibration upload failed");
            media.discard(&stored.url).await;
            return Err(err.into());
        }
        (Err(err), Err(_)) => return Err(err.into()),
    };

    let record = calibration::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        calibration_type: Set(calibration_type),
        image: Set(image.url.clone()),
        video: Set(video.url.clone()),
        created_at: Set(chrono::Utc::now()),
    };

    match record.insert(db).await {
        Ok(model) => {
            info!(id = %model.id, name = %model.name, "Created calibration");
            Ok(model)
        }
        Err(err) => {
            media.discard(&image.url).await;
            media.discard(&video.url).await;
            Err(err.to_business_error("calibration"))
        }
    }
}

pub async fn delete_calibration(
    db: &DatabaseConnection,
    media: &MediaUploader,
    id: Uuid,
) -> Result<(), BusinessError> {
    let record = find_calibration(db, id).await?;
    let (image, video) = (record.image.clone(), record.video.clone());

    record
        .delete(db)
        .await
        .map_err(|err| err.to_business_error("calibration"))?;
    media.discard(&image).await;
    media.discard(&video).await;

    info!(%id, "Deleted calibration");
    Ok(())
}
