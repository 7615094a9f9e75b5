use super::models::DeviceViewRow;
use super::services::group_devices;
use crate::config::test_helpers::setup_test_state;
use crate::routes::build_router;
use crate::test_helpers::{MultipartForm, empty_request, extract_response_body, json_request};
use axum::Router;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 4, 2];
const MP4: &[u8] = &[0, 0, 0, 0x18, b'f', b't', b'y', b'p'];

fn view_row(device_type: &str, tag: &str, image_url: Option<&str>) -> DeviceViewRow {
    DeviceViewRow {
        device_type: device_type.to_string(),
        id: tag.to_string(),
        tag: Some(tag.to_string()),
        device_model: Some("Pressure Transmitter".to_string()),
        location: Some("Skid A".to_string()),
        status: Some("working".to_string()),
        image_url: image_url.map(ToString::to_string),
    }
}

async fn create_equipment(app: &Router, code: &str) -> Value {
    let request = MultipartForm::new()
        .text("code", code)
        .file("image", "separator.jpg", "image/jpeg", JPEG)
        .request("POST", "/api/equipments");
    let (status, body) = extract_response_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::CREATED, "Equipment create failed: {body}");
    body
}

async fn create_linked_transmitter(app: &Router, id: &str, code: &str) {
    let request = MultipartForm::new()
        .text("id", id)
        .text("tag", id)
        .text("type", "Pressure Transmitter")
        .text("location", "Skid A")
        .text("status", "working")
        .text("range", "0-25 bar")
        .text("created_at", "2025-03-01")
        .file("images", "a.jpg", "image/jpeg", &[1])
        .file("images", "b.jpg", "image/jpeg", &[2])
        .file("video", "v.mp4", "video/mp4", MP4)
        .request("POST", "/api/devices/transmitters");
    let (status, body) = extract_response_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::CREATED, "Device create failed: {body}");

    let link = json_request(
        "PUT",
        &format!("/api/devices/transmitters/{id}/equipment"),
        &json!({"equipment_code": code}),
    );
    assert_eq!(app.clone().oneshot(link).await.unwrap().status(), StatusCode::OK);
}

#[test]
fn test_group_devices_merges_rows_per_device() {
    let rows = vec![
        view_row("transmitters", "PT-1001", Some("u1")),
        view_row("transmitters", "PT-1001", Some("u2")),
        view_row("transmitters", "PT-1001", Some("u1")),
        view_row("switches", "PT-1001", None),
        view_row("transmitters", "PT-1002", None),
    ];

    let grouped = group_devices(rows);

    assert_eq!(grouped.len(), 3, "Same tag in another table is another device");
    assert_eq!(grouped[0].tag, "PT-1001");
    assert_eq!(grouped[0].images, vec!["u1", "u2"]);
    assert_eq!(grouped[1].device_type, "switches");
    assert!(grouped[1].images.is_empty());
    assert_eq!(grouped[2].tag, "PT-1002");
}

#[test]
fn test_group_devices_fills_unknown_values() {
    let row = DeviceViewRow {
        device_type: "valves".to_string(),
        id: "XV-1".to_string(),
        tag: None,
        device_model: None,
        location: Some("  ".to_string()),
        status: None,
        image_url: None,
    };

    let grouped = group_devices(vec![row]);

    assert_eq!(grouped[0].tag, "XV-1");
    assert_eq!(grouped[0].device_model, "Unknown");
    assert_eq!(grouped[0].location, "Unknown");
    assert_eq!(grouped[0].status, "Unknown");
    assert!(group_devices(Vec::new()).is_empty());
}

#[tokio::test]
async fn test_equipment_crud() {
    let (state, blobs) = setup_test_state().await;
    let app = build_router(&state);

    let created = create_equipment(&app, "SEP-100").await;
    assert_eq!(created["code"], "SEP-100");
    assert!(created["image_url"].as_str().unwrap().contains("/media/images/"));
    assert_eq!(blobs.len(), 1);

    let duplicate = MultipartForm::new()
        .text("code", "SEP-100")
        .file("image", "other.jpg", "image/jpeg", JPEG)
        .request("POST", "/api/equipments");
    let (status, body) = extract_response_body(app.clone().oneshot(duplicate).await.unwrap()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_RESOURCE");
    assert_eq!(blobs.len(), 1, "Image of the refused equipment is discarded");

    let no_code = MultipartForm::new().request("POST", "/api/equipments");
    let (status, _) = extract_response_body(app.clone().oneshot(no_code).await.unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    create_equipment(&app, "COMP-7").await;
    let (status, list) = extract_response_body(
        app.clone()
            .oneshot(empty_request("GET", "/api/equipments"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|equipment| equipment["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["COMP-7", "SEP-100"]);

    let (status, one) = extract_response_body(
        app.clone()
            .oneshot(empty_request("GET", "/api/equipments/SEP-100"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["id"], created["id"]);

    let (status, _) = extract_response_body(
        app.oneshot(empty_request("GET", "/api/equipments/NOPE-1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_equipment_devices_are_grouped() {
    let (state, _) = setup_test_state().await;
    let app = build_router(&state);

    create_equipment(&app, "SEP-100").await;
    create_linked_transmitter(&app, "PT-1001", "SEP-100").await;
    create_linked_transmitter(&app, "PT-1002", "SEP-100").await;

    let response = app
        .oneshot(empty_request("GET", "/api/equipments/SEP-100/devices"))
        .await
        .unwrap();
    let (status, body) = extract_response_body(response).await;

    assert_eq!(status, StatusCode::OK);
    let devices = body.as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["device_type"], "transmitters");
    assert_eq!(devices[0]["tag"], "PT-1001");
    assert_eq!(devices[0]["type"], "Pressure Transmitter");
    assert_eq!(devices[0]["images"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_equipment_detaches_devices() {
    let (state, blobs) = setup_test_state().await;
    let app = build_router(&state);

    create_equipment(&app, "SEP-100").await;
    create_linked_transmitter(&app, "PT-1001", "SEP-100").await;
    let before = blobs.len();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/api/equipments/SEP-100"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(blobs.len(), before - 1);

    let (_, device) = extract_response_body(
        app.clone()
            .oneshot(empty_request("GET", "/api/devices/transmitters/PT-1001"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(device["equipment_code"], Value::Null);

    let response = app
        .oneshot(empty_request("DELETE", "/api/equipments/SEP-100"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
