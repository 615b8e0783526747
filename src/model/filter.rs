//! Client-side list filtering

use serde::Deserialize;

use super::item::Item;

/// Search box and list toggles applied after items are loaded
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring matched against the item's text fields
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Hide claimed found items and recovered lost items
    #[serde(default, alias = "open")]
    pub open_only: bool,
}

impl ItemFilter {
    #[cfg(test)]
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Returns true if the item passes every active condition
    pub fn matches<T: Item>(&self, item: &T) -> bool {
        if self.open_only && item.is_resolved() {
            return false;
        }

        if let Some(category) = non_blank(&self.category) {
            if !item.category().eq_ignore_ascii_case(category) {
                return false;
            }
        }

        match non_blank(&self.query) {
            Some(query) => {
                let needle = query.to_lowercase();
                item.search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    /// Filter a list, keeping the incoming order
    pub fn apply<T: Item>(&self, items: Vec<T>) -> Vec<T> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }

    fn is_empty(&self) -> bool {
        !self.open_only && non_blank(&self.query).is_none() && non_blank(&self.category).is_none()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
