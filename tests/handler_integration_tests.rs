use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use print_catalog::{
    AppState,
    auth::{self, AuthUser, Claims, TOKEN_AUDIENCE},
    config::{AppConfig, Env},
    error::{AppError, RepoError},
    handlers,
    models::{Category, CreateModelRequest, Model, NewModel, Session, SessionUser},
    repository::{ModelRepository, RemoteModelRepository, RepositoryState},
    supabase::{AuthApiState, InMemoryModelTable, MockAuthApi},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Setup ---

const USER_ID: Uuid = Uuid::from_u128(0xC0FFEE);

/// A repository whose remote is down.
struct BrokenRepo;

#[async_trait]
impl ModelRepository for BrokenRepo {
    async fn list_all(&self) -> Result<Vec<Model>, RepoError> {
        Err(RepoError::Fetch("connection refused".to_string()))
    }
    async fn get_by_id(&self, _id: i64) -> Result<Model, RepoError> {
        Err(RepoError::Fetch("connection refused".to_string()))
    }
    async fn list_by_owner(&self, _user_id: Uuid) -> Result<Vec<Model>, RepoError> {
        Err(RepoError::Fetch("connection refused".to_string()))
    }
    async fn create(&self, _new: NewModel, _user_id: Uuid) -> Result<Model, RepoError> {
        Err(RepoError::Create("permission denied for table models".to_string()))
    }
}

fn seeded_model(id: i64, user_id: Option<Uuid>) -> Model {
    Model {
        id,
        name: format!("Model {}", id),
        description: None,
        image: None,
        category: Category::Miniatures,
        user_id,
        date_added: Utc.with_ymd_and_hms(2024, 1, id as u32, 0, 0, 0).unwrap(),
        likes: 0,
    }
}

fn state_with(repo: RepositoryState, env: Env) -> AppState {
    let auth = Arc::new(
        MockAuthApi::new().with_account("maker@example.com", "correct-horse", USER_ID),
    ) as AuthApiState;
    AppState {
        repo,
        auth,
        config: AppConfig {
            env,
            ..AppConfig::default()
        },
    }
}

fn test_state() -> AppState {
    let table = InMemoryModelTable::with_models(vec![
        seeded_model(1, None),
        seeded_model(2, Some(USER_ID)),
    ]);
    state_with(
        Arc::new(RemoteModelRepository::new(Arc::new(table))),
        Env::Local,
    )
}

fn mint_token(secret: &str, sub: Uuid, exp_offset_secs: i64, aud: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub,
        exp: (now + exp_offset_secs) as usize,
        iat: now as usize,
        aud: aud.to_string(),
        email: Some("maker@example.com".to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn parts_with(headers: &[(&str, &str)]) -> Parts {
    let mut builder = Request::builder().uri("/me");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(()).unwrap().into_parts().0
}

async fn extract(state: &AppState, headers: &[(&str, &str)]) -> Result<AuthUser, AppError> {
    let mut parts = parts_with(headers);
    AuthUser::from_request_parts(&mut parts, state).await
}

fn assert_redirects_to_login(err: AppError) {
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

// --- AuthUser extractor ---

#[tokio::test]
async fn test_valid_bearer_token_resolves_user() {
    let state = test_state();
    let token = mint_token(&state.config.jwt_secret, USER_ID, 3600, TOKEN_AUDIENCE);
    let bearer = format!("Bearer {}", token);

    let user = extract(&state, &[("authorization", &bearer)]).await.unwrap();

    assert_eq!(user.id, USER_ID);
    assert_eq!(user.email.as_deref(), Some("maker@example.com"));
    assert_eq!(user.access_token, Some(token));
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let state = test_state();
    let token = mint_token(&state.config.jwt_secret, USER_ID, 3600, TOKEN_AUDIENCE);
    let cookie = format!("theme=dark; {}={}", auth::SESSION_COOKIE, token);

    let user = extract(&state, &[("cookie", &cookie)]).await.unwrap();
    assert_eq!(user.id, USER_ID);
}

#[tokio::test]
async fn test_session_cookie_found_across_several_cookie_headers() {
    let state = test_state();
    let token = mint_token(&state.config.jwt_secret, USER_ID, 3600, TOKEN_AUDIENCE);
    let cookie = format!("{}={}", auth::SESSION_COOKIE, token);

    let user = extract(&state, &[("cookie", "theme=dark; lang=en"), ("cookie", &cookie)])
        .await
        .unwrap();
    assert_eq!(user.id, USER_ID);
    assert_eq!(user.access_token, Some(token));
}

#[tokio::test]
async fn test_similarly_named_cookie_is_not_a_session() {
    let state = test_state();
    let token = mint_token(&state.config.jwt_secret, USER_ID, 3600, TOKEN_AUDIENCE);
    let cookie = format!("{}-old={}", auth::SESSION_COOKIE, token);

    assert!(matches!(
        extract(&state, &[("cookie", &cookie)]).await,
        Err(AppError::AuthRequired)
    ));
}

#[tokio::test]
async fn test_missing_token_redirects_to_login() {
    let state = test_state();
    let err = extract(&state, &[]).await.unwrap_err();
    assert!(matches!(err, AppError::AuthRequired));
    assert_redirects_to_login(err);
}

#[tokio::test]
async fn test_expired_token_redirects_to_login() {
    let state = test_state();
    let token = mint_token(&state.config.jwt_secret, USER_ID, -3600, TOKEN_AUDIENCE);
    let bearer = format!("Bearer {}", token);

    let err = extract(&state, &[("authorization", &bearer)]).await.unwrap_err();
    assert_redirects_to_login(err);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let state = test_state();
    let token = mint_token(
        "another-secret-that-is-also-at-least-32-chars",
        USER_ID,
        3600,
        TOKEN_AUDIENCE,
    );
    let bearer = format!("Bearer {}", token);

    assert!(matches!(
        extract(&state, &[("authorization", &bearer)]).await,
        Err(AppError::AuthRequired)
    ));
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let state = test_state();
    let token = mint_token(&state.config.jwt_secret, USER_ID, 3600, "anon");
    let bearer = format!("Bearer {}", token);

    assert!(matches!(
        extract(&state, &[("authorization", &bearer)]).await,
        Err(AppError::AuthRequired)
    ));
}

#[tokio::test]
async fn test_local_bypass_header() {
    let state = test_state();
    let id = USER_ID.to_string();

    let user = extract(&state, &[("x-user-id", &id)]).await.unwrap();
    assert_eq!(user.id, USER_ID);
    assert!(user.access_token.is_none());
}

#[tokio::test]
async fn test_bypass_header_ignored_in_production() {
    let state = state_with(Arc::new(BrokenRepo), Env::Production);
    let id = USER_ID.to_string();

    assert!(matches!(
        extract(&state, &[("x-user-id", &id)]).await,
        Err(AppError::AuthRequired)
    ));
}

// --- Handlers called directly ---

#[tokio::test]
async fn test_get_model_not_found_is_404() {
    let err = handlers::get_model(State(test_state()), Path(404))
        .await
        .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remote_failure_is_500() {
    let state = state_with(Arc::new(BrokenRepo), Env::Local);

    let err = handlers::list_models(State(state)).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_get_my_models_only_returns_callers_models() {
    let user = AuthUser {
        id: USER_ID,
        email: None,
        access_token: None,
    };

    let Json(models) = handlers::get_my_models(user, State(test_state()))
        .await
        .unwrap();

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, 2);
}

#[tokio::test]
async fn test_create_model_attributes_owner_from_session() {
    let state = test_state();
    let user = AuthUser {
        id: USER_ID,
        email: None,
        access_token: None,
    };
    let payload = CreateModelRequest {
        title: "  Dice Tower  ".to_string(),
        category: "toys-games".to_string(),
        description: Some("   ".to_string()),
        image: None,
    };

    let (status, Json(model)) = handlers::create_model(user, State(state.clone()), Json(payload))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(model.name, "Dice Tower");
    assert_eq!(model.user_id, Some(USER_ID));
    assert_eq!(model.description, None);
    assert_eq!(state.repo.get_by_id(model.id).await.unwrap(), model);
}

#[tokio::test]
async fn test_create_model_rejected_by_remote_is_500() {
    let state = state_with(Arc::new(BrokenRepo), Env::Local);
    let user = AuthUser {
        id: USER_ID,
        email: None,
        access_token: None,
    };
    let payload = CreateModelRequest {
        title: "Vase".to_string(),
        category: "art".to_string(),
        ..CreateModelRequest::default()
    };

    let err = handlers::create_model(user, State(state), Json(payload))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(msg) if msg.contains("permission denied")));
}

#[tokio::test]
async fn test_list_categories_has_every_category_with_label() {
    let Json(options) = handlers::list_categories().await;

    assert_eq!(options.len(), Category::ALL.len());
    let printer = options
        .iter()
        .find(|o| o.value == Category::ThreeDPrinter)
        .unwrap();
    assert_eq!(printer.label, "3d Printer");
}

// --- Cookie helpers ---

#[test]
fn test_session_cookie_header_round_trips_through_cookie_reader() {
    let session = Session {
        access_token: "abc.def.ghi".to_string(),
        refresh_token: "r".to_string(),
        expires_in: 3600,
        expires_at: 0,
        user: SessionUser {
            id: USER_ID,
            email: None,
        },
    };

    let set_cookie = auth::session_cookie_header(&session);
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=3600"));

    let pair = set_cookie.split(';').next().unwrap().to_string();
    let parts = parts_with(&[("cookie", &pair)]);
    assert_eq!(
        auth::session_cookie(&CookieJar::from_headers(&parts.headers)),
        Some("abc.def.ghi".to_string())
    );
}

#[test]
fn test_cleared_cookie_is_not_a_session() {
    let cleared = auth::clear_session_cookie_header();
    assert!(cleared.contains("Max-Age=0"));

    let pair = cleared.split(';').next().unwrap().to_string();
    let parts = parts_with(&[("cookie", &pair)]);
    assert_eq!(auth::session_cookie(&CookieJar::from_headers(&parts.headers)), None);
}
