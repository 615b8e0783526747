//! In-memory row store for local development and tests

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::query::Query;
use super::StoreError;
use crate::model::Item;

type Table = BTreeMap<Uuid, Value>;

/// Tables of JSON rows keyed by item id.
///
/// Writes hold the table's shard lock for their whole read-check-write, so a
/// conditional update is atomic with respect to other writers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<DashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list<T: Item>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        let Some(table) = self.tables.get(T::TABLE) else {
            return Ok(Vec::new());
        };

        let mut items = table
            .values()
            .filter(|row| query.matches(row))
            .map(|row| serde_json::from_value::<T>(row.clone()).map_err(StoreError::Json))
            .collect::<Result<Vec<T>, StoreError>>()?;
        drop(table);

        if query.is_newest_first() {
            items.sort_by(|a, b| b.reported_date().cmp(&a.reported_date()));
        }

        Ok(items)
    }

    pub fn get<T: Item>(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let Some(table) = self.tables.get(T::TABLE) else {
            return Ok(None);
        };

        table
            .get(&id)
            .map(|row| serde_json::from_value(row.clone()).map_err(StoreError::Json))
            .transpose()
    }

    pub fn insert<T: Item>(&self, item: &T) -> Result<T, StoreError> {
        let row = serde_json::to_value(item).map_err(StoreError::Json)?;
        let mut table = self.tables.entry(T::TABLE).or_default();

        if table.contains_key(&item.id()) {
            return Err(StoreError::Api {
                status: 409,
                body: format!("duplicate key {} in {}", item.id(), T::TABLE),
            });
        }

        table.insert(item.id(), row);
        Ok(item.clone())
    }

    /// Merge `patch` into the row if it exists and matches `conditions`
    pub fn update<T: Item, P: Serialize + ?Sized>(
        &self,
        id: Uuid,
        conditions: &Query,
        patch: &P,
    ) -> Result<Option<T>, StoreError> {
        let patch = serde_json::to_value(patch).map_err(StoreError::Json)?;
        let Value::Object(fields) = patch else {
            return Err(StoreError::Api {
                status: 400,
                body: "update body must be a JSON object".to_string(),
            });
        };

        let mut table = self.tables.entry(T::TABLE).or_default();
        let Some(row) = table.get_mut(&id) else {
            return Ok(None);
        };
        if !conditions.matches(row) {
            return Ok(None);
        }

        let mut updated = row.clone();
        if let Value::Object(columns) = &mut updated {
            columns.extend(fields);
        }

        // Reject patches that would leave the row undecodable
        let item: T = serde_json::from_value(updated.clone()).map_err(StoreError::Json)?;
        *row = updated;

        Ok(Some(item))
    }

    /// Remove the row if it exists and matches `conditions`
    pub fn delete<T: Item>(&self, id: Uuid, conditions: &Query) -> Result<Option<T>, StoreError> {
        let mut table = self.tables.entry(T::TABLE).or_default();

        match table.get(&id) {
            Some(row) if conditions.matches(row) => {}
            _ => return Ok(None),
        }

        table
            .remove(&id)
            .map(|row| serde_json::from_value(row).map_err(StoreError::Json))
            .transpose()
    }

    #[cfg(test)]
    pub fn len<T: Item>(&self) -> usize {
        self.tables.get(T::TABLE).map(|t| t.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actor, ClaimUpdate, FoundItem};
    use chrono::{Duration, Utc};

    fn found(reported_by: &str, minutes_ago: i64) -> FoundItem {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        FoundItem {
            id: Uuid::new_v4(),
            name: "Water bottle".to_string(),
            description: String::new(),
            category: "Other".to_string(),
            location: "Gym".to_string(),
            kept_at: "Front desk".to_string(),
            image_url: String::new(),
            reported_by: reported_by.to_string(),
            reported_by_name: "Finder".to_string(),
            reported_date: at,
            date_found: at,
            claimed: false,
            claimed_by: String::new(),
            claimed_by_name: String::new(),
        }
    }

    #[test]
    fn lists_newest_first_with_conditions() {
        let store = MemoryStore::new();
        let old = store.insert(&found("u1", 30)).unwrap();
        let new = store.insert(&found("u1", 1)).unwrap();
        store.insert(&found("u2", 10)).unwrap();

        let mine: Vec<FoundItem> = store
            .list(&Query::new().eq("reportedBy", "u1").newest_first())
            .unwrap();
        assert_eq!(mine.iter().map(|i| i.id).collect::<Vec<_>>(), vec![new.id, old.id]);
        assert_eq!(store.len::<FoundItem>(), 3);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let store = MemoryStore::new();
        let item = found("u1", 0);
        store.insert(&item).unwrap();

        let err = store.insert(&item).unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 409, .. }));
    }

    #[test]
    fn conditional_update_only_applies_once() {
        let store = MemoryStore::new();
        let item = store.insert(&found("u1", 0)).unwrap();
        let unclaimed = Query::new().eq("claimed", false);
        let claimant = Actor::new("u9", Some("Owner".to_string()));

        let first: Option<FoundItem> = store
            .update(item.id, &unclaimed, &ClaimUpdate::by(&claimant))
            .unwrap();
        let first = first.unwrap();
        assert!(first.claimed);
        assert_eq!(first.claimed_by, "u9");
        assert_eq!(first.claimed_by_name, "Owner");

        let second: Option<FoundItem> = store
            .update(item.id, &unclaimed, &ClaimUpdate::by(&claimant))
            .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn update_and_delete_miss_unknown_ids() {
        let store = MemoryStore::new();
        let none: Option<FoundItem> = store
            .update(Uuid::new_v4(), &Query::new(), &serde_json::json!({ "name": "x" }))
            .unwrap();
        assert!(none.is_none());

        let none: Option<FoundItem> = store.delete(Uuid::new_v4(), &Query::new()).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn delete_respects_conditions() {
        let store = MemoryStore::new();
        let item = store.insert(&found("u1", 0)).unwrap();

        let denied: Option<FoundItem> = store
            .delete(item.id, &Query::new().eq("reportedBy", "u2"))
            .unwrap();
        assert!(denied.is_none());

        let removed: Option<FoundItem> = store
            .delete(item.id, &Query::new().eq("reportedBy", "u1"))
            .unwrap();
        assert_eq!(removed.map(|i| i.id), Some(item.id));
        assert!(store.get::<FoundItem>(item.id).unwrap().is_none());
    }
}
