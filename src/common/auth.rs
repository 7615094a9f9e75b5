//! Session cookie and password hashing helpers

use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::users::models as users;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use crate::users::password::hash_password;
use bcrypt::verify;
use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use lazy_static::lazy_static;
use sea_orm::EntityTrait;
use tracing::{debug, warn};
use utoipa_axum::router::OpenApiRouter;

pub const SESSION_COOKIE: &str = "user_id";

lazy_static! {
    // Verified against when the user does not exist, so a miss costs as
    // much as a wrong password.
    static ref DUMMY_HASH: String =
        hash_password("not-a-real-password").unwrap_or_default();
}

/// Verify a password against a stored hash, or against a dummy hash when
/// there is no stored one.
pub fn verify_password(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(stored) => verify(password, stored).unwrap_or(false),
        None => {
            let _ = verify(password, &DUMMY_HASH);
            false
        }
    }
}

pub fn session_cookie(user_id: &str, max_age_hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, user_id.to_string()))
        .path("/")
        .max_age(Duration::hours(max_age_hours))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// The user id carried by the session cookie, if any.
pub fn session_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim().to_string()).ok())
        .find(|cookie| cookie.name() == SESSION_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// Rejects requests whose session cookie does not name a known user.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = session_user_id(request.headers()) else {
        return BusinessError::Unauthenticated {
            message: "missing session cookie".to_string(),
        }
        .into_response();
    };

    match users::Entity::find_by_id(user_id.clone()).one(&state.db).await {
        Ok(Some(_)) => {
            debug!(user_id = %user_id, "Session accepted");
            next.run(request).await
        }
        Ok(None) => BusinessError::Unauthenticated {
            message: "unknown session".to_string(),
        }
        .into_response(),
        Err(err) => {
            warn!(error = %err, "Session lookup failed");
            BusinessError::Unauthenticated {
                message: "session could not be verified".to_string(),
            }
            .into_response()
        }
    }
}

/// Puts `router` behind the session check when sessions are required.
pub fn protect(router: OpenApiRouter, state: &AppState) -> OpenApiRouter {
    if state.config.require_session {
        router.layer(from_fn_with_state(state.clone(), require_session))
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("secure_password_123").unwrap();

        assert_ne!(hashed, "secure_password_123");
        assert!(verify_password("secure_password_123", Some(&hashed)));
        assert!(!verify_password("wrong_password", Some(&hashed)));
        assert!(!verify_password("secure_password_123", None));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("eng-01", 24).to_string();

        assert!(cookie.starts_with("user_id=eng-01"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_session_user_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; user_id=eng-01; lang=ar"),
        );
        assert_eq!(session_user_id(&headers).as_deref(), Some("eng-01"));

        let mut empty = HeaderMap::new();
        empty.insert(COOKIE, HeaderValue::from_static("user_id="));
        assert_eq!(session_user_id(&empty), None);
        assert_eq!(session_user_id(&HeaderMap::new()), None);
    }
}
