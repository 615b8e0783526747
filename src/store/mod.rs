//! Row storage for item tables
//!
//! [`Backend`] dispatches to Supabase PostgREST in production or to the
//! in-memory store for local runs and tests. Both evaluate the same
//! [`Query`] conditions, which is what makes claim and found-confirmation
//! updates conditional.

pub mod memory;
pub mod query;
pub mod supabase;

pub use memory::MemoryStore;
pub use query::Query;
pub use supabase::SupabaseClient;

use serde::Serialize;
use uuid::Uuid;

use crate::model::Item;

/// Storage backend for lost and found items
#[derive(Clone)]
pub enum Backend {
    Supabase(SupabaseClient),
    Memory(MemoryStore),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Supabase(_) => "supabase",
            Backend::Memory(_) => "memory",
        }
    }

    /// All rows matching the query
    pub async fn list<T: Item>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        match self {
            Backend::Supabase(client) => client.select(T::TABLE, &query.to_params()).await,
            Backend::Memory(store) => store.list(query),
        }
    }

    /// A single row by id
    pub async fn get<T: Item>(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        match self {
            Backend::Supabase(client) => {
                let params = Query::new().eq("id", id.to_string()).to_params();
                client.select_one(T::TABLE, &params).await
            }
            Backend::Memory(store) => store.get(id),
        }
    }

    pub async fn insert<T: Item>(&self, item: &T) -> Result<T, StoreError> {
        match self {
            Backend::Supabase(client) => client.insert(T::TABLE, item).await,
            Backend::Memory(store) => store.insert(item),
        }
    }

    /// Apply `patch` to the row with this id if it also matches `conditions`.
    ///
    /// Returns `None` when no row matched; the caller decides whether that
    /// means "missing" or "condition failed".
    pub async fn update<T: Item, P: Serialize + Sync + ?Sized>(
        &self,
        id: Uuid,
        conditions: &Query,
        patch: &P,
    ) -> Result<Option<T>, StoreError> {
        match self {
            Backend::Supabase(client) => {
                let params = conditions.clone().eq("id", id.to_string()).to_params();
                let rows: Vec<T> = client.update(T::TABLE, &params, patch).await?;
                Ok(rows.into_iter().next())
            }
            Backend::Memory(store) => store.update(id, conditions, patch),
        }
    }

    /// Delete the row with this id if it also matches `conditions`
    pub async fn delete<T: Item>(
        &self,
        id: Uuid,
        conditions: &Query,
    ) -> Result<Option<T>, StoreError> {
        match self {
            Backend::Supabase(client) => {
                let params = conditions.clone().eq("id", id.to_string()).to_params();
                let rows: Vec<T> = client.delete(T::TABLE, &params).await?;
                Ok(rows.into_iter().next())
            }
            Backend::Memory(store) => store.delete(id, conditions),
        }
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Invalid row data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No row returned from insert")]
    NoRowReturned,
}
