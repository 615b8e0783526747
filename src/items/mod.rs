//! Item repository: reports, listings, claims and found confirmations

pub mod validate;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::model::{
    Actor, ClaimUpdate, FoundItem, FoundUpdate, Item, ItemFilter, LostItem, NewFoundItem,
    NewLostItem,
};
use crate::store::{Backend, Query, StoreError};
use crate::util::time;

/// Both kinds of report filed by one user
#[derive(Debug, Clone, Serialize)]
pub struct MyReports {
    pub lost: Vec<LostItem>,
    pub found: Vec<FoundItem>,
}

/// Item operations over a storage backend
#[derive(Clone)]
pub struct ItemRepository {
    backend: Backend,
}

impl ItemRepository {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    pub async fn report_lost(
        &self,
        reporter: &Actor,
        input: NewLostItem,
    ) -> Result<LostItem, ItemError> {
        let now = time::now();
        let fields = validate::lost_item(input, now)?;

        let item = LostItem {
            id: Uuid::new_v4(),
            name: fields.name,
            description: fields.description,
            category: fields.category,
            location: fields.location,
            image_url: fields.image_url,
            reported_by: reporter.user_id.clone(),
            reported_by_name: reporter.display_name.clone(),
            reported_date: now,
            date_lost: fields.date_lost.unwrap_or(now),
            found: false,
            found_by: String::new(),
            found_by_name: String::new(),
        };

        self.insert(item).await
    }

    pub async fn report_found(
        &self,
        reporter: &Actor,
        input: NewFoundItem,
    ) -> Result<FoundItem, ItemError> {
        let now = time::now();
        let fields = validate::found_item(input, now)?;

        let item = FoundItem {
            id: Uuid::new_v4(),
            name: fields.name,
            description: fields.description,
            category: fields.category,
            location: fields.location,
            kept_at: fields.kept_at,
            image_url: fields.image_url,
            reported_by: reporter.user_id.clone(),
            reported_by_name: reporter.display_name.clone(),
            reported_date: now,
            date_found: fields.date_found.unwrap_or(now),
            claimed: false,
            claimed_by: String::new(),
            claimed_by_name: String::new(),
        };

        self.insert(item).await
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// All lost items, newest first
    pub async fn lost_items(&self, filter: &ItemFilter) -> Result<Vec<LostItem>, ItemError> {
        self.list(Query::new(), filter).await
    }

    /// All found items, newest first
    pub async fn found_items(&self, filter: &ItemFilter) -> Result<Vec<FoundItem>, ItemError> {
        self.list(Query::new(), filter).await
    }

    pub async fn lost_items_by(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<Vec<LostItem>, ItemError> {
        self.list(Query::new().eq("reportedBy", user_id), filter).await
    }

    pub async fn found_items_by(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<Vec<FoundItem>, ItemError> {
        self.list(Query::new().eq("reportedBy", user_id), filter).await
    }

    /// Lost and found reports filed by `user_id`, fetched concurrently
    pub async fn my_reports(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<MyReports, ItemError> {
        let (lost, found) = futures::try_join!(
            self.lost_items_by(user_id, filter),
            self.found_items_by(user_id, filter),
        )?;

        Ok(MyReports { lost, found })
    }

    pub async fn lost_item(&self, id: Uuid) -> Result<LostItem, ItemError> {
        self.fetch(id).await
    }

    pub async fn found_item(&self, id: Uuid) -> Result<FoundItem, ItemError> {
        self.fetch(id).await
    }

    // ------------------------------------------------------------------
    // Editing and removal (reporter only)
    // ------------------------------------------------------------------

    pub async fn update_lost(
        &self,
        actor: &Actor,
        id: Uuid,
        input: NewLostItem,
    ) -> Result<LostItem, ItemError> {
        let edit = validate::lost_item(input, time::now())?;
        self.update_owned(actor, id, &edit).await
    }

    pub async fn update_found(
        &self,
        actor: &Actor,
        id: Uuid,
        input: NewFoundItem,
    ) -> Result<FoundItem, ItemError> {
        let edit = validate::found_item(input, time::now())?;
        self.update_owned(actor, id, &edit).await
    }

    pub async fn delete_lost(&self, actor: &Actor, id: Uuid) -> Result<LostItem, ItemError> {
        self.delete_owned(actor, id).await
    }

    pub async fn delete_found(&self, actor: &Actor, id: Uuid) -> Result<FoundItem, ItemError> {
        self.delete_owned(actor, id).await
    }

    // ------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------

    /// Claim a found item for `claimant`.
    ///
    /// The claim flag and claimant identity are written in one conditional
    /// update guarded by `claimed = false`, so two concurrent claims cannot
    /// both succeed.
    pub async fn claim_found(&self, id: Uuid, claimant: &Actor) -> Result<FoundItem, ItemError> {
        let item: FoundItem = self.fetch(id).await?;
        if item.reported_by == claimant.user_id {
            return Err(ItemError::OwnItem);
        }
        if item.claimed {
            return Err(ItemError::AlreadyClaimed);
        }

        let unclaimed = Query::new().eq("claimed", false);
        let updated = self
            .backend
            .update::<FoundItem, _>(id, &unclaimed, &ClaimUpdate::by(claimant))
            .await
            .map_err(store_failure("claim", FoundItem::TABLE))?;

        match updated {
            Some(item) => {
                info!(item_id = %id, claimed_by = %claimant.user_id, "Found item claimed");
                Ok(item)
            }
            None => {
                warn!(item_id = %id, "Claim lost a race or item vanished");
                self.resolve_miss::<FoundItem>(id, ItemError::AlreadyClaimed).await
            }
        }
    }

    /// Record that `finder` has found a lost item
    pub async fn mark_lost_found(&self, id: Uuid, finder: &Actor) -> Result<LostItem, ItemError> {
        let item: LostItem = self.fetch(id).await?;
        if item.reported_by == finder.user_id {
            return Err(ItemError::OwnItem);
        }
        if item.found {
            return Err(ItemError::AlreadyFound);
        }

        let not_found = Query::new().eq("found", false);
        let updated = self
            .backend
            .update::<LostItem, _>(id, &not_found, &FoundUpdate::by(finder))
            .await
            .map_err(store_failure("mark found", LostItem::TABLE))?;

        match updated {
            Some(item) => {
                info!(item_id = %id, found_by = %finder.user_id, "Lost item marked as found");
                Ok(item)
            }
            None => self.resolve_miss::<LostItem>(id, ItemError::AlreadyFound).await,
        }
    }

    // ------------------------------------------------------------------
    // Generic helpers
    // ------------------------------------------------------------------

    async fn insert<T: Item>(&self, item: T) -> Result<T, ItemError> {
        let stored = self
            .backend
            .insert(&item)
            .await
            .map_err(store_failure("insert", T::TABLE))?;

        info!(
            kind = %T::KIND,
            item_id = %stored.id(),
            reported_by = %stored.reported_by(),
            "Item reported"
        );
        Ok(stored)
    }

    async fn list<T: Item>(&self, query: Query, filter: &ItemFilter) -> Result<Vec<T>, ItemError> {
        let items = self
            .backend
            .list::<T>(&query.newest_first())
            .await
            .map_err(store_failure("list", T::TABLE))?;

        Ok(filter.apply(items))
    }

    async fn fetch<T: Item>(&self, id: Uuid) -> Result<T, ItemError> {
        self.backend
            .get::<T>(id)
            .await
            .map_err(store_failure("get", T::TABLE))?
            .ok_or(ItemError::NotFound)
    }

    async fn update_owned<T: Item, P: Serialize + Sync>(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: &P,
    ) -> Result<T, ItemError> {
        let owned = Query::new().eq("reportedBy", actor.user_id.as_str());
        let updated = self
            .backend
            .update::<T, P>(id, &owned, patch)
            .await
            .map_err(store_failure("update", T::TABLE))?;

        match updated {
            Some(item) => {
                info!(kind = %T::KIND, item_id = %id, "Item updated");
                Ok(item)
            }
            None => self.resolve_miss::<T>(id, ItemError::Forbidden).await,
        }
    }

    async fn delete_owned<T: Item>(&self, actor: &Actor, id: Uuid) -> Result<T, ItemError> {
        let owned = Query::new().eq("reportedBy", actor.user_id.as_str());
        let removed = self
            .backend
            .delete::<T>(id, &owned)
            .await
            .map_err(store_failure("delete", T::TABLE))?;

        match removed {
            Some(item) => {
                info!(kind = %T::KIND, item_id = %id, "Item deleted");
                Ok(item)
            }
            None => self.resolve_miss::<T>(id, ItemError::Forbidden).await,
        }
    }

    /// A conditional write matched nothing: either the row is gone, or it
    /// exists and the condition failed.
    async fn resolve_miss<T: Item>(&self, id: Uuid, when_present: ItemError) -> Result<T, ItemError> {
        match self.fetch::<T>(id).await {
            Ok(_) => Err(when_present),
            Err(e) => Err(e),
        }
    }
}

fn store_failure(op: &'static str, table: &'static str) -> impl FnOnce(StoreError) -> ItemError {
    move |e| {
        error!(error = %e, op, table, "Item store operation failed");
        ItemError::Store(e)
    }
}

/// Item workflow errors
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("{0}")]
    Validation(String),

    #[error("Item not found")]
    NotFound,

    #[error("Item has already been claimed")]
    AlreadyClaimed,

    #[error("Item has already been marked as found")]
    AlreadyFound,

    #[error("You cannot claim or confirm an item you reported")]
    OwnItem,

    #[error("Only the reporter can change this item")]
    Forbidden,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
