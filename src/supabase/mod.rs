use reqwest::{Method, RequestBuilder, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod gotrue;
pub mod postgrest;

pub use gotrue::{AuthApi, AuthApiState, GoTrueApi, MockAuthApi};
pub use postgrest::{InMemoryModelTable, ModelTable, PostgrestModelTable, SelectQuery};

/// PostgREST error code for "JSON object requested, multiple (or no) rows returned".
pub const PGRST_NO_ROWS: &str = "PGRST116";

/// SupabaseClient
///
/// The single remote client handle. Constructed once at process start and handed to
/// the table and auth layers (the `reqwest::Client` inside shares one connection pool
/// across clones).
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    // When present, table requests are authorized with this key instead of the anon key.
    service_key: Option<String>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_key: None,
        }
    }

    pub fn with_service_key(mut self, service_key: Option<String>) -> Self {
        self.service_key = service_key;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a request against the PostgREST endpoint of `table`.
    pub(crate) fn rest(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self.service_key.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
    }

    /// Builds a request against the GoTrue endpoint `path` (e.g. "token").
    /// `access_token` authorizes user-scoped calls; the anon key is used otherwise.
    pub(crate) fn auth(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
    ) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        self.http
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
    }
}

/// PostgrestError
///
/// The remote error shape returned by the table endpoint. Transport and decoding
/// failures are folded into the same shape with no `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PostgrestError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// The zero-rows condition of a single-object read.
    pub fn no_rows() -> Self {
        Self {
            details: Some("The result contains 0 rows".to_string()),
            ..Self::new(
                Some(PGRST_NO_ROWS),
                "JSON object requested, multiple (or no) rows returned",
            )
        }
    }

    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(PGRST_NO_ROWS)
    }
}

impl From<reqwest::Error> for PostgrestError {
    fn from(err: reqwest::Error) -> Self {
        PostgrestError::new(None, err.to_string())
    }
}
