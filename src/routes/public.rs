use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session: browsing the catalog and signing in.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /models
        // The whole catalog.
        .route("/models", get(handlers::list_models))
        // GET /models/{id}
        // One model; 404 when it does not exist.
        .route("/models/{id}", get(handlers::get_model))
        // GET /categories
        .route("/categories", get(handlers::list_categories))
        // POST /login
        // Proxies email/password sign-in to the auth service and sets the session cookie.
        .route("/login", post(handlers::login))
}
