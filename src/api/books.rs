//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{BookDetails, BookQuery, CreateBook, UpdateBook},
};

use super::AuthenticatedUser;

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// List of items
    pub items: Vec<T>,
    /// Total number of items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub limit: i64,
}

/// List books with search and pagination. Public endpoint.
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("title" = Option<String>, Query, description = "Search by title (partial, case-insensitive)"),
        ("author" = Option<String>, Query, description = "Search by author (partial, case-insensitive)"),
        ("category_id" = Option<i32>, Query, description = "Filter by category"),
        ("available" = Option<bool>, Query, description = "Filter by availability"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "List of books", body = PaginatedResponse<BookDetails>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<BookDetails>>> {
    let (books, total) = state.services.catalog.search_books(&query).await?;

    Ok(Json(PaginatedResponse {
        items: books,
        total,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    }))
}

/// Get book details by ID. Public endpoint.
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a new book (admin or librarian)
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookDetails),
        (status = 400, description = "Invalid input or unknown category"),
        (status = 403, description = "Not admin or librarian"),
        (status = 409, description = "ISBN already exists")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<BookDetails>)> {
    claims.require_staff()?;
    book.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing book (admin or librarian)
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookDetails),
        (status = 403, description = "Not admin or librarian"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "ISBN already exists")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(book): Json<UpdateBook>,
) -> AppResult<Json<BookDetails>> {
    claims.require_staff()?;
    book.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Delete a book (admin only). Blocked while active loans exist.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Book has active loans"),
        (status = 403, description = "Not admin"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
