use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`; the session check itself is the
/// middleware layered on this router in `create_router`. The caller's id scopes every
/// read and is the owner of every write.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // GET /me/models
        // "My submissions", newest first.
        .route("/me/models", get(handlers::get_my_models))
        // POST /models
        // Submits a new model owned by the caller.
        .route("/models", post(handlers::create_model))
        // POST /logout
        // Revokes the session, clears the cookie and redirects to /login.
        .route("/logout", post(handlers::logout))
}
