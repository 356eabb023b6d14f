use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult, LOGIN_PATH},
    models::{
        self, Category, CategoryOption, CreateModelRequest, LoginRequest, LoginResponse, Model,
        NewModel, UserProfile,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use std::str::FromStr;

// --- Public Handlers ---

/// list_models
///
/// [Public Route] The whole catalog.
#[utoipa::path(
    get,
    path = "/models",
    responses((status = 200, description = "All models", body = [Model]))
)]
pub async fn list_models(State(state): State<AppState>) -> AppResult<Json<Vec<Model>>> {
    let models = state.repo.list_all().await?;
    Ok(Json(models))
}

/// get_model
///
/// [Public Route] One model's detail view. A missing model is a 404 "not found" view;
/// every other failure propagates as a 500.
#[utoipa::path(
    get,
    path = "/models/{id}",
    params(("id" = i64, Path, description = "Model ID")),
    responses(
        (status = 200, description = "Found", body = Model),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_model(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<models::Model>> {
    let model = state.repo.get_by_id(id).await?;
    Ok(Json(model))
}

/// list_categories
///
/// [Public Route] The category picker of the submission form.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [CategoryOption]))
)]
pub async fn list_categories() -> Json<Vec<CategoryOption>> {
    Json(
        Category::ALL
            .into_iter()
            .map(|value| CategoryOption {
                value,
                label: value.label(),
            })
            .collect(),
    )
}

/// login
///
/// [Public Route] Forwards the credentials to the auth service and stores the issued
/// access token in the session cookie.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .auth
        .sign_in_with_password(&payload.email, &payload.password)
        .await?;
    tracing::info!(user_id = %session.user.id, "login succeeded");

    let cookie = auth::session_cookie_header(&session);
    let body = LoginResponse {
        user: session.user,
        expires_at: session.expires_at,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's identity.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(AuthUser { id, email, .. }: AuthUser) -> Json<UserProfile> {
    Json(UserProfile { id, email })
}

/// get_my_models
///
/// [Authenticated Route] "My submissions": the caller's models, newest first.
#[utoipa::path(
    get,
    path = "/me/models",
    responses((status = 200, description = "My Models", body = [Model]))
)]
pub async fn get_my_models(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<models::Model>>> {
    let models = state.repo.list_by_owner(id).await?;
    Ok(Json(models))
}

/// create_model
///
/// [Authenticated Route] Handles the "new model" form. The owner is always the
/// authenticated caller. Title and category are required and the category must be
/// one of the fixed set; blank optional fields are stored as null.
#[utoipa::path(
    post,
    path = "/models",
    request_body = CreateModelRequest,
    responses(
        (status = 201, description = "Created", body = Model),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_model(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateModelRequest>,
) -> AppResult<(StatusCode, Json<models::Model>)> {
    let new_model = validate_new_model(payload)?;
    let model = state.repo.create(new_model, id).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

/// logout
///
/// [Authenticated Route] Revokes the session at the auth service (best effort), clears
/// the cookie and sends the caller back to the login view.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Redirect to login"))
)]
pub async fn logout(user: AuthUser, State(state): State<AppState>) -> impl IntoResponse {
    if let Some(token) = user.access_token.as_deref() {
        if let Err(e) = state.auth.sign_out(token).await {
            tracing::warn!(user_id = %user.id, "remote sign out failed: {}", e);
        }
    }
    (
        [(header::SET_COOKIE, auth::clear_session_cookie_header())],
        Redirect::to(LOGIN_PATH),
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turns the raw form payload into a `NewModel`, timestamped now.
pub fn validate_new_model(payload: CreateModelRequest) -> Result<NewModel, AppError> {
    let name = payload.title.trim().to_string();
    if name.is_empty() || payload.category.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and category are required".to_string(),
        ));
    }
    let category = Category::from_str(payload.category.trim()).map_err(AppError::BadRequest)?;

    Ok(NewModel {
        name,
        description: non_blank(payload.description),
        image: non_blank(payload.image),
        category,
        date_added: Utc::now(),
    })
}
