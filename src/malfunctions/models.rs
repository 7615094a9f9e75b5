use chrono::{DateTime, Utc};
use crudcrate::{CRUDResource, EntityToModels, traits::MergeIntoActiveModel};
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel, entity::prelude::*};
use uuid::Uuid;

#[derive(
    Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "critical")]
    Critical,
    #[sea_orm(string_value = "recurring")]
    Recurring,
    #[sea_orm(string_value = "moderate")]
    Moderate,
    #[sea_orm(string_value = "minor")]
    Minor,
}

#[derive(
    Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    #[sea_orm(string_value = "important")]
    Important,
    #[sea_orm(string_value = "moderate")]
    Moderate,
    #[sea_orm(string_value = "minor")]
    Minor,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "malfunctions")]
#[crudcrate(
    generate_router,
    api_struct = "Malfunction",
    name_singular = "malfunction",
    name_plural = "malfunctions",
    description = "Malfunction log entries recorded against the plant, rated by severity and importance.",
    fn_create = create_malfunction,
    fn_update = update_malfunction,
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable, fulltext)]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    #[crudcrate(filterable, fulltext)]
    pub description: String,
    #[crudcrate(sortable, filterable, enum_field)]
    pub severity: Severity,
    #[crudcrate(sortable, filterable, enum_field)]
    pub importance: Importance,
    #[crudcrate(update_model = false, create_model = false, on_create = chrono::Utc::now(), sortable)]
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Title and description may not be blank.
fn check_text(field: &str, value: &str) -> Result<String, DbErr> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DbErr::Custom(format!(
            "Validation failed: {field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(super) async fn create_malfunction(
    db: &DatabaseConnection,
    mut create_data: MalfunctionCreate,
) -> Result<Malfunction, DbErr> {
    create_data.title = check_text("title", &create_data.title)?;
    create_data.description = check_text("description", &create_data.description)?;

    let active_model: ActiveModel = create_data.into();
    let inserted = active_model.insert(db).await?;
    tracing::info!(id = %inserted.id, severity = ?inserted.severity, "Logged malfunction");

    Malfunction::get_one(db, inserted.id).await
}

pub(super) async fn update_malfunction(
    db: &DatabaseConnection,
    id: Uuid,
    mut update_data: MalfunctionUpdate,
) -> Result<Malfunction, DbErr> {
    if let Some(Some(title)) = update_data.title.as_mut() {
        *title = check_text("title", title)?;
    }
    if let Some(Some(description)) = update_data.description.as_mut() {
        *description = check_text("description", description)?;
    }

    let existing = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("Malfunction not found".to_string()))?;

    let updated = update_data.merge_into_activemodel(existing.into_active_model())?;
    updated.update(db).await?;

    Malfunction::get_one(db, id).await
}
