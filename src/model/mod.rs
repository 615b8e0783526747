//! Item data model and list filtering

pub mod filter;
pub mod item;

pub use filter::ItemFilter;
pub use item::{
    Actor, ClaimUpdate, FoundItem, FoundItemEdit, FoundUpdate, Item, LostItem,
    LostItemEdit, NewFoundItem, NewLostItem, CATEGORIES,
};
