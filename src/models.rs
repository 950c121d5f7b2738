use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_QUANTITY: i64 = 1;
pub const MAX_TEXT_LENGTH: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GroceryItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub purchased: bool,
    pub quantity: i64,
}

impl fmt::Display for GroceryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.quantity)
    }
}

/// A validated item ready to insert. Defaults are already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub purchased: bool,
    pub quantity: i64,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        NewItem {
            name: name.into(),
            category: DEFAULT_CATEGORY.to_string(),
            purchased: false,
            quantity: DEFAULT_QUANTITY,
        }
    }
}

/// Validated partial update; `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub purchased: Option<bool>,
    pub quantity: Option<i64>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.purchased.is_none()
            && self.quantity.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UpdatedResponse {
    pub updated: u64,
}
