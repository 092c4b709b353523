//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub category_id: i32,
    /// Total copies owned
    pub quantity: i32,
    /// Copies not currently on loan. Invariant: 0 <= available <= quantity
    pub available: i32,
    pub created_at: DateTime<Utc>,
}

/// Short category reference embedded in book responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
}

/// Book with its category for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub category: CategoryRef,
    pub quantity: i32,
    pub available: i32,
}

/// Book search query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Partial, case-insensitive title match
    pub title: Option<String>,
    /// Partial, case-insensitive author match
    pub author: Option<String>,
    pub category_id: Option<i32>,
    /// true = has available copies, false = none available
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10-13 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: String,
    #[validate(length(max = 255, message = "Publisher must be at most 255 characters"))]
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 9999, message = "Year must be a four-digit year"))]
    pub year: Option<i32>,
    pub category_id: i32,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10-13 characters"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: Option<String>,
    #[validate(length(max = 255, message = "Publisher must be at most 255 characters"))]
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 9999, message = "Year must be a four-digit year"))]
    pub year: Option<i32>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i32>,
}

/// New availability after a quantity change.
///
/// `available` moves by the same delta as `quantity` and is clamped at 0;
/// it is never settable directly (loans own the decrement/increment).
pub fn adjust_available(quantity: i32, available: i32, new_quantity: i32) -> i32 {
    let delta = new_quantity - quantity;
    (available + delta).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_increase_raises_available() {
        assert_eq!(adjust_available(2, 1, 5), 4);
    }

    #[test]
    fn quantity_decrease_lowers_available() {
        assert_eq!(adjust_available(5, 4, 3), 2);
    }

    #[test]
    fn available_clamped_at_zero() {
        // 3 copies all on loan, stock cut to 1: available stays 0
        assert_eq!(adjust_available(3, 0, 1), 0);
        assert_eq!(adjust_available(5, 1, 2), 0);
    }

    #[test]
    fn unchanged_quantity_keeps_available() {
        assert_eq!(adjust_available(4, 2, 4), 2);
    }
}
