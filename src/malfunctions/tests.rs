use super::models::{Importance, MalfunctionCreate, Severity, create_malfunction};
use crate::config::test_helpers::{setup_test_app, setup_test_db};
use crate::test_helpers::{empty_request, extract_response_body, json_request};
use axum::http::StatusCode;
use sea_orm::DbErr;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_malfunction_crud_operations() {
    let app = setup_test_app().await;

    let create = json_request(
        "POST",
        "/api/malfunctions",
        &json!({
            "title": "  Seal leak on P-101  ",
            "description": "Mechanical seal weeping at the drive end",
            "severity": "recurring",
            "importance": "important"
        }),
    );
    let (status, created) = extract_response_body(app.clone().oneshot(create).await.unwrap()).await;
    assert_eq!(status, StatusCode::CREATED, "Failed to create malfunction: {created:?}");
    assert_eq!(created["title"], "Seal leak on P-101");
    assert_eq!(created["severity"], "recurring");

    let id = created["id"].as_str().unwrap().to_string();
    let (status, fetched) = extract_response_body(
        app.clone()
            .oneshot(empty_request("GET", &format!("/api/malfunctions/{id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["importance"], "important");

    let update = json_request(
        "PUT",
        &format!("/api/malfunctions/{id}"),
        &json!({"severity": "minor"}),
    );
    let (status, updated) = extract_response_body(app.clone().oneshot(update).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK, "Failed to update malfunction: {updated:?}");
    assert_eq!(updated["severity"], "minor");
    assert_eq!(updated["title"], "Seal leak on P-101");

    let (status, list) = extract_response_body(
        app.clone()
            .oneshot(empty_request("GET", "/api/malfunctions"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/malfunctions/{id}")))
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = app
        .oneshot(empty_request("GET", &format!("/api/malfunctions/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malfunction_rejects_unknown_severity() {
    let app = setup_test_app().await;

    let create = json_request(
        "POST",
        "/api/malfunctions",
        &json!({
            "title": "Vibration",
            "description": "High vibration on fan",
            "severity": "catastrophic",
            "importance": "minor"
        }),
    );
    let response = app.oneshot(create).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_blank_title_fails_validation() {
    let db = setup_test_db().await;

    let result = create_malfunction(
        &db,
        MalfunctionCreate {
            title: "   ".to_string(),
            description: "Something broke".to_string(),
            severity: Severity::Critical,
            importance: Importance::Moderate,
        },
    )
    .await;

    match result {
        Err(DbErr::Custom(message)) => assert!(message.starts_with("Validation failed: title")),
        Err(other) => panic!("Expected validation failure, got {other}"),
        Ok(_) => panic!("Blank title was accepted"),
    }
}
