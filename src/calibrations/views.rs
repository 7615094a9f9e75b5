use super::models::Model as Calibration;
use super::services::{self, NewCalibration};
use crate::common::auth::protect;
use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::forms::{FormData, read_form};
use crate::common::state::AppState;
use crate::devices::media::{MediaFile, MediaUploader};
use crate::validation_error;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    let router = OpenApiRouter::new()
        .routes(routes!(list_calibrations, create_calibration))
        .routes(routes!(get_calibration, delete_calibration))
        .with_state(state.clone());

    protect(router, state)
}

fn single_file(form: &mut FormData, part: &str) -> BusinessResult<MediaFile> {
    let mut files = form.take_files(&[part]);
    match files.len() {
        0 => Err(validation_error!(part, format!("{part} is required"))),
        1 => Ok(files.remove(0)),
        _ => Err(validation_error!(part, format!("only one {part} is allowed"))),
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Calibrations, newest first", body = Vec<Calibration>)),
    tag = "calibrations",
    summary = "List calibrations"
)]
pub async fn list_calibrations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Calibration>>, BusinessError> {
    Ok(Json(services::list_calibrations(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body(
        content_type = "multipart/form-data",
        description = "`name` and `type` text parts, one `image` and one `video` file part"
    ),
    responses(
        (status = 201, description = "Calibration created", body = Calibration),
        (status = 400, description = "Missing field or file"),
        (status = 502, description = "Upload failed")
    ),
    tag = "calibrations",
    summary = "Create a calibration"
)]
pub async fn create_calibration(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Calibration>), BusinessError> {
    let mut form = read_form(multipart).await?;
    let new = NewCalibration {
        name: form.take_text("name").unwrap_or_default(),
        calibration_type: form.take_text("type").unwrap_or_default(),
        image: single_file(&mut form, "image")?,
        video: single_file(&mut form, "video")?,
    };

    let created =
        services::create_calibration(&state.db, &MediaUploader::from_state(&state), new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Calibration id")),
    responses(
        (status = 200, description = "Calibration", body = Calibration),
        (status = 404, description = "Calibration not found")
    ),
    tag = "calibrations",
    summary = "Get a calibration"
)]
pub async fn get_calibration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Calibration>, BusinessError> {
    Ok(Json(services::find_calibration(&state.db, id).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Calibration id")),
    responses(
        (status = 204, description = "Calibration and its media deleted"),
        (status = 404, description = "Calibration not found")
    ),
    tag = "calibrations",
    summary = "Delete a calibration"
)]
pub async fn delete_calibration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, BusinessError> {
    services::delete_calibration(&state.db, &MediaUploader::from_state(&state), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
