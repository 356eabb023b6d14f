use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Catalog Schemas (Mapped to the remote `models` table) ---

/// Category
///
/// The fixed set of catalog categories offered by the submission form.
/// Serialized in kebab-case, matching the values stored in the `category` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Category {
    ToysGames,
    Household,
    PropsCosplay,
    Education,
    Art,
    Tools,
    Miniatures,
    Fashion,
    #[serde(rename = "3d-printer")]
    ThreeDPrinter,
    HobbyDiy,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::ToysGames,
        Category::Household,
        Category::PropsCosplay,
        Category::Education,
        Category::Art,
        Category::Tools,
        Category::Miniatures,
        Category::Fashion,
        Category::ThreeDPrinter,
        Category::HobbyDiy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ToysGames => "toys-games",
            Category::Household => "household",
            Category::PropsCosplay => "props-cosplay",
            Category::Education => "education",
            Category::Art => "art",
            Category::Tools => "tools",
            Category::Miniatures => "miniatures",
            Category::Fashion => "fashion",
            Category::ThreeDPrinter => "3d-printer",
            Category::HobbyDiy => "hobby-diy",
        }
    }

    /// Human-readable label ("toys-games" -> "Toys Games").
    pub fn label(&self) -> String {
        self.as_str()
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Model
///
/// One user-submitted catalog entry, as stored in the remote `models` table.
/// `id` and `likes` are server-managed; `user_id` is absent for entries that were
/// seeded rather than submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Model {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub user_id: Option<Uuid>,

    // The remote column is camelCase.
    #[serde(rename = "dateAdded")]
    #[ts(type = "string")]
    pub date_added: DateTime<Utc>,

    #[serde(default)]
    pub likes: i64,
}

/// NewModel
///
/// The data a caller supplies to create a model. Ownership is attached separately
/// by the repository, never taken from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NewModel {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Category,
    #[serde(rename = "dateAdded")]
    #[ts(type = "string")]
    pub date_added: DateTime<Utc>,
}

/// ModelRow
///
/// The insert row sent to the remote table. Used both by `create` (with an owner)
/// and by the seeding binary (which may carry pre-existing like counts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "dateAdded")]
    pub date_added: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
}

impl ModelRow {
    /// Attributes `new` to `user_id`.
    pub fn owned_by(new: NewModel, user_id: Uuid) -> Self {
        Self {
            name: new.name,
            description: new.description,
            image: new.image,
            category: new.category,
            user_id: Some(user_id),
            date_added: new.date_added,
            likes: None,
        }
    }
}

/// --- Request Payloads (Input Schemas) ---

/// CreateModelRequest
///
/// Input payload of the "new model" form (POST /models). Category arrives as a raw
/// string and is validated by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateModelRequest {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// LoginRequest
///
/// Email/password pair forwarded to the auth service (POST /login). The password is
/// never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// --- Session Schemas (observed, owned by the auth service) ---

/// SessionUser
///
/// The identity part of a session as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session
///
/// Server-issued proof of authentication. Deserializes straight from the auth
/// service's token grant response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds. Filled from `expires_in` when the service omits it.
    #[serde(default)]
    pub expires_at: i64,
    pub user: SessionUser,
}

impl Session {
    /// True when the session is expired or will be within `margin_secs` of `now`.
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at <= now + margin_secs
    }
}

/// AuthChangeEvent
///
/// The kinds of auth-state notifications delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// AuthStateChange
///
/// One notification: the event and the session as it stands after the event.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

/// --- Output Schemas ---

/// LoginResponse
///
/// Returned by POST /login alongside the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: SessionUser,
    pub expires_at: i64,
}

/// UserProfile
///
/// The authenticated caller's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
}

/// CategoryOption
///
/// One entry of the category picker (GET /categories).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryOption {
    pub value: Category,
    pub label: String,
}
