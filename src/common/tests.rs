use super::models::{HealthCheck, UIConfiguration};
use crate::config::Config;
use crate::config::test_helpers::setup_test_app;
use crate::devices::schema::DeviceKind;
use crate::test_helpers::extract_response_body;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

#[test]
fn test_ui_configuration_from_config() {
    let config = UIConfiguration::new(&Config::for_tests());

    assert_eq!(config.app_name, "instrument-api-test");
    assert_eq!(config.deployment, "test");
    assert_eq!(
        config.media_base_url,
        "http://storage.test/storage/v1/object/public/media"
    );
    assert_eq!(config.device_kinds.len(), 4);
    assert!(config.device_kinds.contains(&DeviceKind::Valves));
    assert!(!config.require_session);
}

#[test]
fn test_ui_configuration_serialization() {
    let config = UIConfiguration::new(&Config::for_tests());

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["appName"], "instrument-api-test");
    assert_eq!(json["deviceKinds"][0], "transmitters");
    assert!(json.get("mediaBaseUrl").is_some());
}

#[test]
fn test_health_check_deserialization() {
    let json = r#"{"status":"degraded","database":false,"deployment":"prod"}"#;
    let health: HealthCheck = serde_json::from_str(json).unwrap();
    assert_eq!(health.status, "degraded");
    assert!(!health.database);
}

#[tokio::test]
async fn test_healthz_reports_database_up() {
    let app = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
    assert_eq!(body["deployment"], "test");
}

#[tokio::test]
async fn test_ui_config_endpoint() {
    let app = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let (status, body) = extract_response_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deployment"], "test");
}
