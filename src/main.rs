use print_catalog::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{RemoteModelRepository, RepositoryState},
    supabase::{AuthApiState, GoTrueApi, PostgrestModelTable, SupabaseClient},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, builds the one remote client and everything
/// that depends on it, then serves HTTP.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "print_catalog=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // The single remote client, injected into both the table and the auth layer.
    let supabase = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key)
        .with_service_key(config.supabase_service_key.clone());
    tracing::info!(url = %supabase.base_url(), "Supabase client ready");

    let table = Arc::new(PostgrestModelTable::new(supabase.clone()));
    let repo = Arc::new(RemoteModelRepository::new(table)) as RepositoryState;
    let auth = Arc::new(GoTrueApi::new(supabase)) as AuthApiState;

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState { repo, auth, config };
    let app = create_router(app_state);

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("FATAL: could not bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
