//! Category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CategoryWithBooks, CreateCategory, UpdateCategory},
};

use super::AuthenticatedUser;

/// List all categories with book counts. Public endpoint.
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses(
        (status = 200, description = "List of categories", body = Vec<CategoryWithBooks>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<CategoryWithBooks>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Get category details by ID. Public endpoint.
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category details", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    let category = state.services.catalog.get_category(id).await?;
    Ok(Json(category))
}

/// Create a new category (admin or librarian)
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 403, description = "Not admin or librarian"),
        (status = 409, description = "Name already exists")
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(category): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    claims.require_staff()?;
    category
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let created = state.services.catalog.create_category(category).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a category (admin or librarian)
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 403, description = "Not admin or librarian"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Name already exists")
    )
)]
pub async fn update_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(category): Json<UpdateCategory>,
) -> AppResult<Json<Category>> {
    claims.require_staff()?;
    category
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = state.services.catalog.update_category(id, category).await?;
    Ok(Json(updated))
}

/// Delete a category (admin only). Blocked while books are linked.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 400, description = "Category has linked books"),
        (status = 403, description = "Not admin"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
