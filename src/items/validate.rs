//! Report form validation

use chrono::{DateTime, Duration, Utc};

use super::ItemError;
use crate::model::{FoundItemEdit, LostItemEdit, NewFoundItem, NewLostItem, CATEGORIES};
use crate::util::time::CLOCK_SKEW_SECS;

/// Normalize a category to its canonical spelling; blank means "Other"
pub fn category(raw: &str) -> Result<String, ItemError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok("Other".to_string());
    }

    CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(raw))
        .map(|c| c.to_string())
        .ok_or_else(|| {
            ItemError::Validation(format!(
                "Unknown category '{}', expected one of: {}",
                raw,
                CATEGORIES.join(", ")
            ))
        })
}

fn required(value: &str, message: &str) -> Result<String, ItemError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ItemError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

/// Event dates may not be in the future
fn event_date(
    date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ItemError> {
    if date.is_some_and(|d| d > now + Duration::seconds(CLOCK_SKEW_SECS)) {
        return Err(ItemError::Validation("Date cannot be in the future".to_string()));
    }
    Ok(date)
}

pub fn lost_item(input: NewLostItem, now: DateTime<Utc>) -> Result<LostItemEdit, ItemError> {
    Ok(LostItemEdit {
        name: required(&input.name, "Item name is required")?,
        location: required(&input.location, "Last seen location is required")?,
        description: input.description.trim().to_string(),
        category: category(&input.category)?,
        image_url: input.image_url.trim().to_string(),
        date_lost: event_date(input.date_lost, now)?,
    })
}

pub fn found_item(input: NewFoundItem, now: DateTime<Utc>) -> Result<FoundItemEdit, ItemError> {
    Ok(FoundItemEdit {
        name: required(&input.name, "Item name is required")?,
        location: required(&input.location, "Found location is required")?,
        kept_at: required(&input.kept_at, "Please specify where the item is kept")?,
        description: input.description.trim().to_string(),
        category: category(&input.category)?,
        image_url: input.image_url.trim().to_string(),
        date_found: event_date(input.date_found, now)?,
    })
}
