use super::models::{EquipmentDevice, Model as Equipment};
use super::services;
use crate::common::auth::protect;
use crate::common::errors::BusinessError;
use crate::common::forms::read_form;
use crate::common::state::AppState;
use crate::devices::media::MediaUploader;
use crate::validation_error;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    let router = OpenApiRouter::new()
        .routes(routes!(list_equipments, create_equipment))
        .routes(routes!(get_equipment, delete_equipment))
        .routes(routes!(get_equipment_devices))
        .with_state(state.clone());

    protect(router, state)
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "All equipments by code", body = Vec<Equipment>)),
    tag = "equipments",
    summary = "List equipments"
)]
pub async fn list_equipments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Equipment>>, BusinessError> {
    Ok(Json(services::list_equipments(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body(
        content_type = "multipart/form-data",
        description = "`code` text part and an optional `image` file part"
    ),
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Missing code or bad image"),
        (status = 409, description = "Code already in use")
    ),
    tag = "equipments",
    summary = "Create an equipment"
)]
pub async fn create_equipment(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Equipment>), BusinessError> {
    let mut form = read_form(multipart).await?;
    let code = form.take_text("code").unwrap_or_default();
    let mut images = form.take_files(&["image", "images"]);
    if images.len() > 1 {
        return Err(validation_error!("image", "only one image is allowed"));
    }
    if let Some((part, _)) = form.files.first() {
        return Err(validation_error!(part, "unexpected file"));
    }

    let equipment = services::create_equipment(
        &state.db,
        &MediaUploader::from_state(&state),
        &code,
        images.pop(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

#[utoipa::path(
    get,
    path = "/{code}",
    params(("code" = String, Path, description = "Equipment code")),
    responses(
        (status = 200, description = "Equipment", body = Equipment),
        (status = 404, description = "Equipment not found")
    ),
    tag = "equipments",
    summary = "Get an equipment"
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Equipment>, BusinessError> {
    Ok(Json(services::find_equipment(&state.db, &code).await?))
}

#[utoipa::path(
    delete,
    path = "/{code}",
    params(("code" = String, Path, description = "Equipment code")),
    responses(
        (status = 204, description = "Equipment deleted and its devices detached"),
        (status = 404, description = "Equipment not found")
    ),
    tag = "equipments",
    summary = "Delete an equipment"
)]
pub async fn delete_equipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, BusinessError> {
    services::delete_equipment(
        &state.db,
        state.records.as_ref(),
        &MediaUploader::from_state(&state),
        &code,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{code}/devices",
    params(("code" = String, Path, description = "Equipment code")),
    responses(
        (status = 200, description = "Linked devices of every type with their images", body = Vec<EquipmentDevice>),
        (status = 404, description = "Equipment not found")
    ),
    tag = "equipments",
    summary = "List devices linked to an equipment"
)]
pub async fn get_equipment_devices(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<EquipmentDevice>>, BusinessError> {
    Ok(Json(services::equipment_devices(&state.db, &code).await?))
}
