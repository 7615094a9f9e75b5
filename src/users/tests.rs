use super::models::{self as users, UserCreate};
use super::services;
use crate::config::test_helpers::setup_test_state;
use crate::routes::build_router;
use crate::test_helpers::{empty_request, extract_response_body, json_request};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::COOKIE, header::SET_COOKIE};
use sea_orm::EntityTrait;
use serde_json::json;
use tower::ServiceExt;

async fn app_with_sessions() -> (Router, sea_orm::DatabaseConnection) {
    let (mut state, _) = setup_test_state().await;
    state.config.require_session = true;
    services::create_user(
        &state.db,
        UserCreate {
            id: "eng-01".to_string(),
            full_name: "Field Engineer".to_string(),
            role: "engineer".to_string(),
            password: "correct horse".to_string(),
        },
    )
    .await
    .unwrap();
    (build_router(&state), state.db.clone())
}

fn with_session(uri: &str, user_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(COOKIE, format!("user_id={user_id}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_password_is_stored_hashed() {
    let (_, db) = app_with_sessions().await;

    let stored = users::Entity::find_by_id("eng-01".to_string())
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    assert_ne!(stored.password_hash, "correct horse");
    assert!(stored.password_hash.starts_with("$2"));
    assert!(!stored.online);
}

#[tokio::test]
async fn test_login_sets_cookie_and_marks_online() {
    let (app, db) = app_with_sessions().await;

    let login = json_request(
        "POST",
        "/api/users/login",
        &json!({"id": "eng-01", "password": "correct horse"}),
    );
    let response = app.clone().oneshot(login).await.unwrap();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let (status, body) = extract_response_body(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "eng-01");
    assert!(body.get("password_hash").is_none());
    assert!(cookie.starts_with("user_id=eng-01"));
    assert!(cookie.contains("Max-Age=86400"));
    assert!(cookie.contains("HttpOnly"));

    let stored = users::Entity::find_by_id("eng-01".to_string())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.online);
    assert!(stored.last_login.is_some());

    let (status, me) = extract_response_body(
        app.clone()
            .oneshot(with_session("/api/users/me", "eng-01"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["full_name"], "Field Engineer");

    let logout = Request::builder()
        .method("POST")
        .uri("/api/users/logout")
        .header(COOKIE, "user_id=eng-01")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(
        response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let stored = users::Entity::find_by_id("eng-01".to_string())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.online);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (app, _) = app_with_sessions().await;

    for (id, password) in [("eng-01", "wrong password"), ("ghost", "correct horse")] {
        let login = json_request(
            "POST",
            "/api/users/login",
            &json!({"id": id, "password": password}),
        );
        let response = app.clone().oneshot(login).await.unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());

        let (status, body) = extract_response_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }
}

#[tokio::test]
async fn test_session_guards_api_routes() {
    let (app, _) = app_with_sessions().await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/devices/transmitters"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(with_session("/api/devices/transmitters", "intruder"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(with_session("/api/devices/transmitters", "eng-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/users/me"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(empty_request("GET", "/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_get_user() {
    let (app, _) = app_with_sessions().await;

    let create = Request::builder()
        .method("POST")
        .uri("/api/users")
        .header("content-type", "application/json")
        .header(COOKIE, "user_id=eng-01")
        .body(Body::from(
            json!({"id": "tech-02", "full_name": "Instrument Tech", "password": "calibrate-me"})
                .to_string(),
        ))
        .unwrap();
    let (status, created) = extract_response_body(app.clone().oneshot(create).await.unwrap()).await;
    assert_eq!(status, StatusCode::CREATED, "Create failed: {created}");
    assert_eq!(created["role"], "engineer");
    assert!(created.get("password_hash").is_none());

    let (status, fetched) = extract_response_body(
        app.clone()
            .oneshot(with_session("/api/users/tech-02", "eng-01"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["full_name"], "Instrument Tech");

    let (status, _) = extract_response_body(
        app.oneshot(with_session("/api/users/nobody", "eng-01"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_user_validation() {
    let (state, _) = setup_test_state().await;

    let short = services::create_user(
        &state.db,
        UserCreate {
            id: "tech-03".to_string(),
            full_name: "Tech".to_string(),
            role: "engineer".to_string(),
            password: "short".to_string(),
        },
    )
    .await;
    assert!(matches!(
        short,
        Err(crate::common::errors::BusinessError::ValidationError { .. })
    ));

    let first = UserCreate {
        id: "tech-03".to_string(),
        full_name: "Tech".to_string(),
        role: "engineer".to_string(),
        password: "long enough".to_string(),
    };
    services::create_user(&state.db, first).await.unwrap();
    let again = services::create_user(
        &state.db,
        UserCreate {
            id: "tech-03".to_string(),
            full_name: "Tech".to_string(),
            role: "engineer".to_string(),
            password: "long enough".to_string(),
        },
    )
    .await;
    assert!(matches!(
        again,
        Err(crate::common::errors::BusinessError::Duplicate { .. })
    ));
}

#[tokio::test]
async fn test_bootstrap_admin_is_idempotent() {
    let (mut state, _) = setup_test_state().await;
    state.config.admin_user_id = Some("admin".to_string());
    state.config.admin_password = Some("bootstrap-secret".to_string());

    services::bootstrap_admin(&state.db, &state.config).await.unwrap();
    services::bootstrap_admin(&state.db, &state.config).await.unwrap();

    let admin = services::find_user(&state.db, "admin").await.unwrap();
    assert_eq!(admin.role, "admin");
    assert!(services::login(&state.db, "admin", "bootstrap-secret").await.is_ok());
}
