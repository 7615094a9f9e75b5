use super::media::MediaFile;
use super::models::{Device, DeviceSummary, EquipmentLink};
use super::orchestrator::{SaveOrchestrator, SaveReport, SaveRequest};
use super::schema::{DeviceKind, DeviceSchemaDescriptor};
use super::services;
use super::validation::DeviceDraft;
use crate::common::auth::protect;
use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::forms::read_form;
use crate::common::state::AppState;
use crate::validation_error;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use utoipa_axum::{router::OpenApiRouter, routes};

const IMAGE_PARTS: &[&str] = &["images", "image"];
const VIDEO_PARTS: &[&str] = &["video"];

pub fn router(state: &AppState) -> OpenApiRouter {
    let router = OpenApiRouter::new()
        .routes(routes!(list_devices, create_device))
        .routes(routes!(get_fields))
        .routes(routes!(get_device, update_device, delete_device))
        .routes(routes!(attach_images))
        .routes(routes!(link_equipment))
        .with_state(state.clone());

    protect(router, state)
}

fn parse_kind(kind: &str) -> BusinessResult<DeviceKind> {
    DeviceKind::from_table(kind).ok_or_else(|| crate::not_found!("Device type", kind))
}

/// Splits a device form into the orchestrator's request.
async fn read_save_request(multipart: Multipart) -> BusinessResult<SaveRequest> {
    let mut form = read_form(multipart).await?;

    let images = form.take_files(IMAGE_PARTS);
    let videos = form.take_files(VIDEO_PARTS);
    if let Some((part, file)) = form.files.first() {
        return Err(validation_error!(
            part,
            format!("unexpected file '{}'", file.file_name)
        ));
    }
    let remove_images = form
        .take_texts("remove_images")
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();

    let mut draft = DeviceDraft::default();
    for (name, value) in form.text {
        draft.insert(&name, value)?;
    }

    Ok(SaveRequest {
        draft,
        images,
        videos,
        remove_images,
    })
}

async fn read_images(multipart: Multipart) -> BusinessResult<Vec<MediaFile>> {
    let mut form = read_form(multipart).await?;
    let images = form.take_files(IMAGE_PARTS);
    if let Some((part, _)) = form.files.first() {
        return Err(validation_error!(part, "only image files are accepted here"));
    }
    Ok(images)
}

#[utoipa::path(
    get,
    path = "/{kind}",
    params(("kind" = DeviceKind, Path, description = "Device type")),
    responses(
        (status = 200, description = "Devices of this type with their main image", body = Vec<DeviceSummary>),
        (status = 404, description = "Unknown device type")
    ),
    tag = "devices",
    summary = "List devices"
)]
pub async fn list_devices(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<DeviceSummary>>, BusinessError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(services::list_devices(state.records.as_ref(), kind).await?))
}

#[utoipa::path(
    get,
    path = "/{kind}/fields",
    params(("kind" = DeviceKind, Path, description = "Device type")),
    responses(
        (status = 200, description = "Form definition", body = DeviceSchemaDescriptor),
        (status = 404, description = "Unknown device type")
    ),
    tag = "devices",
    summary = "Describe the device form"
)]
pub async fn get_fields(
    Path(kind): Path<String>,
) -> Result<Json<DeviceSchemaDescriptor>, BusinessError> {
    Ok(Json(parse_kind(&kind)?.schema().describe()))
}

#[utoipa::path(
    post,
    path = "/{kind}",
    params(("kind" = DeviceKind, Path, description = "Device type")),
    request_body(
        content_type = "multipart/form-data",
        description = "Device fields as text parts, `images` file parts and one `video` file part"
    ),
    responses(
        (status = 201, description = "Device saved; image failures are listed in the report", body = SaveReport),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "A device with this id already exists"),
        (status = 502, description = "Video upload failed")
    ),
    tag = "devices",
    summary = "Create a device"
)]
pub async fn create_device(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    multipart: Multipart,
) -> Result<Response, BusinessError> {
    let kind = parse_kind(&kind)?;
    let request = read_save_request(multipart).await?;

    Ok(
        match SaveOrchestrator::from_state(&state, kind).create(request).await {
            Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
            Err(failure) => failure.into_response(),
        },
    )
}

#[utoipa::path(
    get,
    path = "/{kind}/{id}",
    params(
        ("kind" = DeviceKind, Path, description = "Device type"),
        ("id" = String, Path, description = "Device id")
    ),
    responses(
        (status = 200, description = "Device with its images, main image first", body = Device),
        (status = 404, description = "Device not found")
    ),
    tag = "devices",
    summary = "Get a device"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Device>, BusinessError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(
        services::get_device(state.records.as_ref(), kind, &id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/{kind}/{id}",
    params(
        ("kind" = DeviceKind, Path, description = "Device type"),
        ("id" = String, Path, description = "Device id")
    ),
    request_body(
        content_type = "multipart/form-data",
        description = "Changed fields, new `images`, an optional replacement `video` and `remove_images` URLs"
    ),
    responses(
        (status = 200, description = "Device updated", body = SaveReport),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Device not found")
    ),
    tag = "devices",
    summary = "Update a device"
)]
pub async fn update_device(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Response, BusinessError> {
    let kind = parse_kind(&kind)?;
    let request = read_save_request(multipart).await?;

    Ok(
        match SaveOrchestrator::from_state(&state, kind)
            .update(&id, request)
            .await
        {
            Ok(report) => Json(report).into_response(),
            Err(failure) => failure.into_response(),
        },
    )
}

#[utoipa::path(
    delete,
    path = "/{kind}/{id}",
    params(
        ("kind" = DeviceKind, Path, description = "Device type"),
        ("id" = String, Path, description = "Device id")
    ),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "Device not found")
    ),
    tag = "devices",
    summary = "Delete a device"
)]
pub async fn delete_device(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode, BusinessError> {
    let kind = parse_kind(&kind)?;
    SaveOrchestrator::from_state(&state, kind).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{kind}/{id}/images",
    params(
        ("kind" = DeviceKind, Path, description = "Device type"),
        ("id" = String, Path, description = "Device id")
    ),
    request_body(
        content_type = "multipart/form-data",
        description = "One or more `images` file parts"
    ),
    responses(
        (status = 200, description = "Images appended after the existing ones", body = SaveReport),
        (status = 400, description = "No usable image"),
        (status = 404, description = "Device not found")
    ),
    tag = "devices",
    summary = "Attach images to a device"
)]
pub async fn attach_images(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Response, BusinessError> {
    let kind = parse_kind(&kind)?;
    let files = read_images(multipart).await?;

    Ok(
        match SaveOrchestrator::from_state(&state, kind)
            .attach_images(&id, files)
            .await
        {
            Ok(report) => Json(report).into_response(),
            Err(failure) => failure.into_response(),
        },
    )
}

#[utoipa::path(
    put,
    path = "/{kind}/{id}/equipment",
    params(
        ("kind" = DeviceKind, Path, description = "Device type"),
        ("id" = String, Path, description = "Device id")
    ),
    request_body = EquipmentLink,
    responses(
        (status = 200, description = "Device with its new equipment link", body = Device),
        (status = 404, description = "Device or equipment not found")
    ),
    tag = "devices",
    summary = "Link a device to an equipment"
)]
pub async fn link_equipment(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(link): Json<EquipmentLink>,
) -> Result<Json<Device>, BusinessError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(
        services::link_equipment(
            &state.db,
            state.records.as_ref(),
            kind,
            &id,
            link.equipment_code,
        )
        .await?,
    ))
}
