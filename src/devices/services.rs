use super::images;
use super::models::{Device, DeviceSummary};
use super::schema::DeviceKind;
use super::store::{self, Filter, RecordStore, Row};
use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::equipments::models as equipments;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::Value;
use tracing::info;

pub async fn list_devices(
    records: &dyn RecordStore,
    kind: DeviceKind,
) -> BusinessResult<Vec<DeviceSummary>> {
    let rows = store::list_devices(records, kind).await?;
    let mut main_images = images::main_images(records, kind).await?;

    Ok(rows
        .into_iter()
        .map(|fields| {
            let main_image = fields
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| main_images.remove(id));
            DeviceSummary { fields, main_image }
        })
        .collect())
}

pub async fn get_device(
    records: &dyn RecordStore,
    kind: DeviceKind,
    id: &str,
) -> BusinessResult<Device> {
    let fields = store::find_device(records, kind, id).await?;
    let images = images::list_images(records, kind, id).await?;
    Ok(Device {
        kind,
        fields,
        images,
    })
}

/// Points a device at an equipment, or detaches it with `None`.
pub async fn link_equipment(
    db: &DatabaseConnection,
    records: &dyn RecordStore,
    kind: DeviceKind,
    id: &str,
    equipment_code: Option<String>,
) -> BusinessResult<Device> {
    let code = equipment_code
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty());

    if let Some(code) = &code {
        let exists = equipments::Entity::find()
            .filter(equipments::Column::Code.eq(code.as_str()))
            .one(db)
            .await
            .map_err(|err| err.to_business_error("equipment"))?;
        if exists.is_none() {
            return Err(crate::not_found!("Equipment", code));
        }
    }

    let mut row = Row::new();
    row.insert(
        "equipment_code".to_string(),
        code.as_deref().map_or(Value::Null, Value::from),
    );
    store::update_device(records, kind, id, row).await?;
    info!(kind = %kind, id, equipment_code = ?code, "Updated equipment link");

    get_device(records, kind, id).await
}

/// Detaches every device of every kind from `code`.
pub async fn unlink_equipment_everywhere(
    records: &dyn RecordStore,
    code: &str,
) -> BusinessResult<u64> {
    let mut detached = 0;
    for kind in DeviceKind::ALL {
        let mut row = Row::new();
        row.insert("equipment_code".to_string(), Value::Null);
        detached += records
            .update(kind.table(), &Filter::eq("equipment_code", code), row)
            .await
            .map_err(|err| err.to_business_error(kind.singular()))?;
    }
    Ok(detached)
}
