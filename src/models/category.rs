//! Category model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Category model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Category with the number of books linked to it
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CategoryWithBooks {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub book_count: i64,
}

/// Create category request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Update category request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}
