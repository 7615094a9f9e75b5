use super::images::DeviceImage;
use super::schema::DeviceKind;
use super::store::Row;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One device row with its ordered images.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Device {
    pub kind: DeviceKind,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Row,
    pub images: Vec<DeviceImage>,
}

/// List entry: the device row plus its main image.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeviceSummary {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Row,
    pub main_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EquipmentLink {
    /// Equipment code to link, or `null` to unlink.
    pub equipment_code: Option<String>,
}
