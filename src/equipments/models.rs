use chrono::{DateTime, Utc};
use sea_orm::QueryResult;
use sea_orm::entity::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

/// A higher-level asset that devices point at through `equipment_code`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "equipments")]
#[schema(as = Equipment)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// One device linked to an equipment, with every image it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EquipmentDevice {
    pub device_type: String,
    pub id: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub device_model: String,
    pub location: String,
    pub status: String,
    pub images: Vec<String>,
}

/// A raw `devices_view` row: one per device and image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceViewRow {
    pub device_type: String,
    pub id: String,
    pub tag: Option<String>,
    pub device_model: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub image_url: Option<String>,
}

impl DeviceViewRow {
    pub fn from_result(result: &QueryResult) -> Result<Self, DbErr> {
        Ok(Self {
            device_type: result.try_get("", "device_type")?,
            id: result.try_get("", "id")?,
            tag: result.try_get("", "tag")?,
            device_model: result.try_get("", "type")?,
            location: result.try_get("", "location")?,
            status: result.try_get("", "status")?,
            image_url: result.try_get("", "image_url")?,
        })
    }
}
