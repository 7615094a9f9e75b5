use super::models::{HealthCheck, UIConfiguration};
use crate::common::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(healthz))
        .routes(routes!(get_ui_config))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = OK, description = "Database reachable", body = HealthCheck),
        (status = SERVICE_UNAVAILABLE, description = "Database unreachable", body = HealthCheck)
    ),
    tag = "health"
)]
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    let database_up = state.db.ping().await.is_ok();
    let status = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheck {
            status: if database_up { "ok" } else { "degraded" }.to_string(),
            database: database_up,
            deployment: state.config.deployment.clone(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/config",
    responses((status = OK, description = "Client configuration", body = UIConfiguration)),
    tag = "health"
)]
pub async fn get_ui_config(State(state): State<AppState>) -> Json<UIConfiguration> {
    Json(UIConfiguration::new(&state.config))
}
