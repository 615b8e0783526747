//! Lost and found item records

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when the caller has none
pub const ANONYMOUS_NAME: &str = "Anonymous User";

/// Categories offered by the report form
pub const CATEGORIES: [&str; 7] = [
    "Electronics",
    "Clothing",
    "Books",
    "Keys",
    "Wallet",
    "Jewelry",
    "Other",
];

/// Which of the two item tables a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Lost,
    Found,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Lost => write!(f, "lost"),
            ItemKind::Found => write!(f, "found"),
        }
    }
}

/// Capability shared by lost and found reports.
///
/// Implementors are stored as one row per item in `TABLE`, serialized with
/// the same camelCase field names the mobile client uses.
pub trait Item: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Backing table name
    const TABLE: &'static str;
    const KIND: ItemKind;

    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    fn location(&self) -> &str;
    fn reported_by(&self) -> &str;
    fn reported_date(&self) -> DateTime<Utc>;

    /// Whether the item has been resolved (claimed or found)
    fn is_resolved(&self) -> bool;

    /// Text fields matched by the search box
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name(), self.description(), self.category(), self.location()]
    }
}

/// A report of a missing item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LostItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(rename = "lastSeenLocation")]
    pub location: String,
    #[serde(default)]
    pub image_url: String,
    pub reported_by: String,
    pub reported_by_name: String,
    pub reported_date: DateTime<Utc>,
    pub date_lost: DateTime<Utc>,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub found_by: String,
    #[serde(default)]
    pub found_by_name: String,
}

impl Item for LostItem {
    const TABLE: &'static str = "lost_items";
    const KIND: ItemKind = ItemKind::Lost;

    fn id(&self) -> Uuid {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn location(&self) -> &str {
        &self.location
    }
    fn reported_by(&self) -> &str {
        &self.reported_by
    }
    fn reported_date(&self) -> DateTime<Utc> {
        self.reported_date
    }
    fn is_resolved(&self) -> bool {
        self.found
    }
}

/// A report of a recovered item, claimable by its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub location: String,
    pub kept_at: String,
    #[serde(default)]
    pub image_url: String,
    pub reported_by: String,
    pub reported_by_name: String,
    pub reported_date: DateTime<Utc>,
    pub date_found: DateTime<Utc>,
    #[serde(default)]
    pub claimed: bool,
    #[serde(default)]
    pub claimed_by: String,
    #[serde(default)]
    pub claimed_by_name: String,
}

impl Item for FoundItem {
    const TABLE: &'static str = "found_items";
    const KIND: ItemKind = ItemKind::Found;

    fn id(&self) -> Uuid {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn location(&self) -> &str {
        &self.location
    }
    fn reported_by(&self) -> &str {
        &self.reported_by
    }
    fn reported_date(&self) -> DateTime<Utc> {
        self.reported_date
    }
    fn is_resolved(&self) -> bool {
        self.claimed
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name(),
            self.description(),
            self.category(),
            self.location(),
            &self.kept_at,
        ]
    }
}

/// The authenticated user acting on an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, display_name: Option<String>) -> Self {
        let display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS_NAME.to_string());

        Self {
            user_id: user_id.into(),
            display_name,
        }
    }
}

/// Lost item submission
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLostItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Last seen location
    #[serde(default, alias = "lastSeenLocation")]
    pub location: String,
    #[serde(default)]
    pub image_url: String,
    pub date_lost: Option<DateTime<Utc>>,
}

/// Found item submission
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFoundItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub kept_at: String,
    #[serde(default)]
    pub image_url: String,
    pub date_found: Option<DateTime<Utc>>,
}

/// Editable fields of a lost item, written as a partial update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LostItemEdit {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "lastSeenLocation")]
    pub location: String,
    pub image_url: String,
    /// Left out of the patch when absent so edits keep the stored date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_lost: Option<DateTime<Utc>>,
}

/// Editable fields of a found item, written as a partial update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundItemEdit {
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub kept_at: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_found: Option<DateTime<Utc>>,
}

/// Claim update; the three fields always travel together
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimUpdate {
    pub claimed: bool,
    pub claimed_by: String,
    pub claimed_by_name: String,
}

impl ClaimUpdate {
    pub fn by(actor: &Actor) -> Self {
        Self {
            claimed: true,
            claimed_by: actor.user_id.clone(),
            claimed_by_name: actor.display_name.clone(),
        }
    }
}

/// Found-confirmation update for a lost item
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundUpdate {
    pub found: bool,
    pub found_by: String,
    pub found_by_name: String,
}

impl FoundUpdate {
    pub fn by(actor: &Actor) -> Self {
        Self {
            found: true,
            found_by: actor.user_id.clone(),
            found_by_name: actor.display_name.clone(),
        }
    }
}
