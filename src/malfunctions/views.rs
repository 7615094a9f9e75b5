pub use super::models::router as crudrouter;
use crate::common::auth::protect;
use crate::common::state::AppState;
use utoipa_axum::router::OpenApiRouter;

pub fn router(state: &AppState) -> OpenApiRouter {
    protect(crudrouter(&state.db.clone()), state)
}
