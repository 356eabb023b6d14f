use crate::{
    error::RepoError,
    models::{Model, ModelRow, NewModel},
    supabase::{ModelTable, PostgrestError, SelectQuery},
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// ModelRepository Trait
///
/// Defines the contract for all catalog reads and writes, so handlers never see the
/// remote table or its error shape. Every method is a single round trip; there is no
/// caching, batching, retry or pagination.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn ModelRepository>`) shareable across Axum's task boundaries.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Every model in the catalog.
    async fn list_all(&self) -> Result<Vec<Model>, RepoError>;

    /// Exactly one model. `NotFound` when the id matches nothing.
    async fn get_by_id(&self, id: i64) -> Result<Model, RepoError>;

    /// The owner's models, newest first. An owner with no models yields an empty vec.
    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<Model>, RepoError>;

    /// Inserts `new` attributed to `user_id` and returns the stored record.
    async fn create(&self, new: NewModel, user_id: Uuid) -> Result<Model, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the repository across the application state.
pub type RepositoryState = Arc<dyn ModelRepository>;

/// RemoteModelRepository
///
/// The implementation of `ModelRepository` backed by the remote `models` table.
/// The table handle is injected, so tests substitute `InMemoryModelTable`.
pub struct RemoteModelRepository {
    table: Arc<dyn ModelTable>,
}

impl RemoteModelRepository {
    pub fn new(table: Arc<dyn ModelTable>) -> Self {
        Self { table }
    }
}

fn not_found(id: i64) -> RepoError {
    RepoError::NotFound(format!("Model with id {} not found", id))
}

#[async_trait]
impl ModelRepository for RemoteModelRepository {
    async fn list_all(&self) -> Result<Vec<Model>, RepoError> {
        self.table
            .select(&SelectQuery::all())
            .await
            .map_err(|e| {
                tracing::error!("list_all error: {:?}", e);
                RepoError::Fetch(e.message)
            })
    }

    /// get_by_id
    ///
    /// Maps the remote zero-rows condition (`PGRST116`) to `NotFound` and every other
    /// remote error to `Fetch`. A successful response that still carries no record is
    /// also reported as `NotFound`.
    async fn get_by_id(&self, id: i64) -> Result<Model, RepoError> {
        let query = SelectQuery::all().eq("id", id);

        match self.table.select_single(&query).await {
            Ok(Some(model)) => Ok(model),
            Ok(None) => Err(not_found(id)),
            Err(e) if e.is_no_rows() => {
                tracing::debug!("model {} not found", id);
                Err(not_found(id))
            }
            Err(e) => {
                tracing::error!("get_by_id error: {:?}", e);
                Err(RepoError::Fetch(e.message))
            }
        }
    }

    /// list_by_owner
    ///
    /// Ordering is the remote sort clause (`order=dateAdded.desc`), not a local sort.
    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<Model>, RepoError> {
        let query = SelectQuery::all()
            .eq("user_id", user_id)
            .order("dateAdded", false);

        self.table.select(&query).await.map_err(|e| {
            tracing::error!("list_by_owner error: {:?}", e);
            RepoError::Fetch(e.message)
        })
    }

    async fn create(&self, new: NewModel, user_id: Uuid) -> Result<Model, RepoError> {
        let row = ModelRow::owned_by(new, user_id);

        let mut inserted = self
            .table
            .insert(std::slice::from_ref(&row))
            .await
            .map_err(|e: PostgrestError| {
                tracing::error!("create error: {:?}", e);
                RepoError::Create(e.message)
            })?;

        let model = inserted
            .pop()
            .ok_or_else(|| RepoError::Create("insert returned no record".to_string()))?;
        tracing::info!(model_id = model.id, %user_id, "model created");
        Ok(model)
    }
}
