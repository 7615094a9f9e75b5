use crate::common::state::AppState;
use crate::{calibrations, devices, equipments, malfunctions, users};
use axum::{Router, extract::DefaultBodyLimit};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

/// Uploads carry several photos and a video per request.
const MAX_BODY_BYTES: usize = 30 * 1024 * 1024;

pub fn build_router(app_state: &AppState) -> Router {
    #[derive(OpenApi)]
    #[openapi(
        modifiers(&SessionCookieAddon),
        security(
            ("sessionCookie" = [])
        ),
        info(
            title = "Instrument inventory API",
            description = "Devices, equipments, calibrations, malfunctions and users of an industrial plant"
        )
    )]
    struct ApiDoc;

    struct SessionCookieAddon;

    impl utoipa::Modify for SessionCookieAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme(
                    "sessionCookie",
                    utoipa::openapi::security::SecurityScheme::ApiKey(
                        utoipa::openapi::security::ApiKey::Cookie(
                            utoipa::openapi::security::ApiKeyValue::new(
                                crate::common::auth::SESSION_COOKIE,
                            ),
                        ),
                    ),
                );
            }
        }
    }

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(crate::common::views::router(app_state)) // Root routes
        .nest("/api/devices", devices::views::router(app_state))
        .nest("/api/equipments", equipments::views::router(app_state))
        .nest("/api/calibrations", calibrations::views::router(app_state))
        .nest("/api/malfunctions", malfunctions::views::router(app_state))
        .nest("/api/users", users::views::router(app_state))
        .split_for_parts();

    router
        .merge(Scalar::with_url("/api/docs", api))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
