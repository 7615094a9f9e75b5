use super::models::{LoginRequest, UserCreate, UserProfile};
use super::services;
use crate::common::auth::{expired_session_cookie, protect, session_cookie, session_user_id};
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cookie::Cookie;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    let public = OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(logout))
        .with_state(state.clone());

    let protected = OpenApiRouter::new()
        .routes(routes!(create_user))
        .routes(routes!(me))
        .routes(routes!(get_user))
        .with_state(state.clone());

    public.merge(protect(protected, state))
}

fn with_cookie(mut response: Response, cookie: &Cookie<'static>) -> Response {
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; sets the session cookie", body = UserProfile),
        (status = 401, description = "Wrong user id or password")
    ),
    tag = "users",
    summary = "Log in"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Response, BusinessError> {
    let user = services::login(&state.db, &credentials.id, &credentials.password).await?;
    let cookie = session_cookie(&user.id, state.config.session_max_age_hours);
    Ok(with_cookie(Json(user).into_response(), &cookie))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Logged out; clears the session cookie")),
    tag = "users",
    summary = "Log out"
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, BusinessError> {
    if let Some(user_id) = session_user_id(&headers) {
        services::logout(&state.db, &user_id).await?;
    }
    Ok(with_cookie(
        StatusCode::NO_CONTENT.into_response(),
        &expired_session_cookie(),
    ))
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The logged-in user", body = UserProfile),
        (status = 401, description = "No session")
    ),
    tag = "users",
    summary = "Current user"
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, BusinessError> {
    let user_id = session_user_id(&headers).ok_or_else(|| BusinessError::Unauthenticated {
        message: "missing session cookie".to_string(),
    })?;
    let user = services::find_user(&state.db, &user_id)
        .await
        .map_err(|err| match err {
            BusinessError::NotFound { .. } => BusinessError::Unauthenticated {
                message: "unknown session".to_string(),
            },
            other => other,
        })?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    summary = "Get a user"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, BusinessError> {
    Ok(Json(services::find_user(&state.db, &id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Missing field or short password"),
        (status = 409, description = "User id already taken")
    ),
    tag = "users",
    summary = "Create a user"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(new): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserProfile>), BusinessError> {
    let user = services::create_user(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
