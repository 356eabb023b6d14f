use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the Supabase project (REST and auth live under it).
    pub supabase_url: String,
    // Public API key sent as `apikey` on every remote call.
    pub supabase_anon_key: String,
    // Optional privileged key for server-side table access. Falls back to the anon key.
    pub supabase_service_key: Option<String>,
    // Secret used to verify the auth service's JWTs.
    pub jwt_secret: String,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Runtime environment marker. Controls the local `x-user-id` bypass and log format.
    pub env: Env,
}

/// Env
///
/// Switches between local development conveniences and production hardening.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_SUPABASE_URL: &str = "http://localhost:54321";
const LOCAL_ANON_KEY: &str = "local-anon-key";
const LOCAL_JWT_SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters-long";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            supabase_url: LOCAL_SUPABASE_URL.to_string(),
            supabase_anon_key: LOCAL_ANON_KEY.to_string(),
            supabase_service_key: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when `SUPABASE_URL`, `SUPABASE_ANON_KEY` or
    /// `SUPABASE_JWT_SECRET` is missing, so the server never starts half-configured.
    /// Local mode falls back to the Supabase CLI defaults.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let supabase_service_key = env::var("SUPABASE_SERVICE_ROLE_KEY").ok();

        match env {
            Env::Local => Self {
                supabase_url: env::var("SUPABASE_URL")
                    .unwrap_or_else(|_| LOCAL_SUPABASE_URL.to_string()),
                supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                    .unwrap_or_else(|_| LOCAL_ANON_KEY.to_string()),
                supabase_service_key,
                jwt_secret: env::var("SUPABASE_JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                bind_addr,
                env: Env::Local,
            },
            Env::Production => Self {
                supabase_url: env::var("SUPABASE_URL")
                    .expect("FATAL: SUPABASE_URL required in prod"),
                supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                    .expect("FATAL: SUPABASE_ANON_KEY required in prod"),
                supabase_service_key,
                jwt_secret: env::var("SUPABASE_JWT_SECRET")
                    .expect("FATAL: SUPABASE_JWT_SECRET must be set in production."),
                bind_addr,
                env: Env::Production,
            },
        }
    }
}
