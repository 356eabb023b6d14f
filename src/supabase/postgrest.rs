use async_trait::async_trait;
use reqwest::{Method, Response, header};
use std::{cmp::Ordering, sync::Mutex};

use super::{PostgrestError, SupabaseClient};
use crate::models::{Model, ModelRow};

/// SelectQuery
///
/// The subset of the PostgREST query language the catalog needs: equality filters
/// and a single sort clause. Rendered to query-string pairs by `to_params`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
}

impl SelectQuery {
    /// `select=*` with no filter.
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds `column=eq.value`.
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    /// Sets `order=column.asc|desc`.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<(&str, bool)> {
        self.order.as_ref().map(|(c, asc)| (c.as_str(), *asc))
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &self.filters {
            params.push((column.clone(), format!("eq.{}", value)));
        }
        if let Some((column, ascending)) = &self.order {
            let direction = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        params
    }
}

/// ModelTable
///
/// The remote `models` table resource. Returns the raw remote error shape; turning
/// it into domain failures is the repository's job.
#[async_trait]
pub trait ModelTable: Send + Sync {
    /// Every row matching `query`, in the requested order.
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Model>, PostgrestError>;

    /// Exactly one row. Zero (or several) matching rows is a `PGRST116` error.
    async fn select_single(&self, query: &SelectQuery) -> Result<Option<Model>, PostgrestError>;

    /// Inserts `rows` and returns the stored records.
    async fn insert(&self, rows: &[ModelRow]) -> Result<Vec<Model>, PostgrestError>;
}

// --- The Real Implementation (PostgREST over HTTP) ---

/// PostgrestModelTable
///
/// Talks to `{SUPABASE_URL}/rest/v1/models`.
#[derive(Clone)]
pub struct PostgrestModelTable {
    client: SupabaseClient,
    table: String,
}

impl PostgrestModelTable {
    pub fn new(client: SupabaseClient) -> Self {
        Self {
            client,
            table: "models".to_string(),
        }
    }
}

/// Reads the remote error body of a non-2xx response.
async fn decode_error(response: Response) -> PostgrestError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    serde_json::from_slice::<PostgrestError>(&body)
        .unwrap_or_else(|_| PostgrestError::new(None, format!("HTTP {}", status)))
}

#[async_trait]
impl ModelTable for PostgrestModelTable {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Model>, PostgrestError> {
        let response = self
            .client
            .rest(Method::GET, &self.table)
            .query(&query.to_params())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }
        Ok(response.json::<Vec<Model>>().await?)
    }

    async fn select_single(&self, query: &SelectQuery) -> Result<Option<Model>, PostgrestError> {
        let response = self
            .client
            .rest(Method::GET, &self.table)
            .header(header::ACCEPT, "application/vnd.pgrst.object+json")
            .query(&query.to_params())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice::<Option<Model>>(&body)
            .map_err(|e| PostgrestError::new(None, format!("invalid response body: {}", e)))
    }

    async fn insert(&self, rows: &[ModelRow]) -> Result<Vec<Model>, PostgrestError> {
        let response = self
            .client
            .rest(Method::POST, &self.table)
            .header("Prefer", "return=representation")
            .query(&[("select", "*")])
            .json(rows)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }
        Ok(response.json::<Vec<Model>>().await?)
    }
}

// --- The In-Memory Implementation (Tests and offline runs) ---

/// InMemoryModelTable
///
/// A substitutable fake of the remote table. It evaluates `SelectQuery` filters and
/// ordering locally, assigns ids like a serial column, and reproduces PostgREST's
/// `PGRST116` on single-object reads that match zero or several rows.
pub struct InMemoryModelTable {
    rows: Mutex<Vec<Model>>,
    /// When set, every call fails with this remote error.
    pub fail_with: Option<PostgrestError>,
}

impl Default for InMemoryModelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryModelTable {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn with_models(models: Vec<Model>) -> Self {
        Self {
            rows: Mutex::new(models),
            fail_with: None,
        }
    }

    pub fn failing(error: PostgrestError) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    fn check_failure(&self) -> Result<(), PostgrestError> {
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn matching(&self, query: &SelectQuery) -> Vec<Model> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<Model> = rows
            .iter()
            .filter(|model| {
                query
                    .filters()
                    .iter()
                    .all(|(column, value)| column_text(model, column).as_deref() == Some(value.as_str()))
            })
            .cloned()
            .collect();

        if let Some((column, ascending)) = query.ordering() {
            found.sort_by(|a, b| {
                let ord = compare_column(a, b, column);
                if ascending { ord } else { ord.reverse() }
            });
        }
        found
    }
}

fn column_text(model: &Model, column: &str) -> Option<String> {
    match column {
        "id" => Some(model.id.to_string()),
        "name" => Some(model.name.clone()),
        "category" => Some(model.category.as_str().to_string()),
        "user_id" => model.user_id.map(|id| id.to_string()),
        _ => None,
    }
}

fn compare_column(a: &Model, b: &Model, column: &str) -> Ordering {
    match column {
        "dateAdded" => a.date_added.cmp(&b.date_added),
        "likes" => a.likes.cmp(&b.likes),
        "name" => a.name.cmp(&b.name),
        _ => a.id.cmp(&b.id),
    }
}

#[async_trait]
impl ModelTable for InMemoryModelTable {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Model>, PostgrestError> {
        self.check_failure()?;
        Ok(self.matching(query))
    }

    async fn select_single(&self, query: &SelectQuery) -> Result<Option<Model>, PostgrestError> {
        self.check_failure()?;
        let mut found = self.matching(query);
        if found.len() != 1 {
            return Err(PostgrestError::no_rows());
        }
        Ok(found.pop())
    }

    async fn insert(&self, rows: &[ModelRow]) -> Result<Vec<Model>, PostgrestError> {
        self.check_failure()?;
        let mut stored = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut next_id = stored.iter().map(|m| m.id).max().unwrap_or(0) + 1;

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let model = Model {
                id: next_id,
                name: row.name.clone(),
                description: row.description.clone(),
                image: row.image.clone(),
                category: row.category,
                user_id: row.user_id,
                date_added: row.date_added,
                likes: row.likes.unwrap_or(0),
            };
            next_id += 1;
            stored.push(model.clone());
            inserted.push(model);
        }
        Ok(inserted)
    }
}
