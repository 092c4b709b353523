//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::loan::{LoanDetails, LoanQuery},
};

use super::{books::PaginatedResponse, AuthenticatedUser};

/// Borrow request: the borrower is the authenticated user
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book to borrow
    pub book_id: i32,
}

/// Plain pagination parameters
#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// List loans with filtering and pagination.
/// Members see only their own loans; staff see all and may filter by user.
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by status: active, returned or overdue"),
        ("user_id" = Option<i32>, Query, description = "Filter by user (admin/librarian only)"),
        ("book_id" = Option<i32>, Query, description = "Filter by book"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default: 10)")
    ),
    responses(
        (status = 200, description = "List of loans", body = PaginatedResponse<LoanDetails>),
        (status = 400, description = "Invalid status filter"),
        (status = 403, description = "Member filtering another user's loans")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    let (loans, total) = state.services.loans.list_loans(&query, &claims).await?;

    Ok(Json(PaginatedResponse {
        items: loans,
        total,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(10),
    }))
}

/// Get the current user's loans
#[utoipa::path(
    get,
    path = "/loans/my-loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default: 10)")
    ),
    responses(
        (status = 200, description = "Current user's loans", body = PaginatedResponse<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let (loans, total) = state.services.loans.my_loans(claims.user_id, page, limit).await?;

    Ok(Json(PaginatedResponse {
        items: loans,
        total,
        page,
        limit,
    }))
}

/// List all overdue loans (admin or librarian)
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default: 10)")
    ),
    responses(
        (status = 200, description = "Overdue loans", body = PaginatedResponse<LoanDetails>),
        (status = 403, description = "Not admin or librarian")
    )
)]
pub async fn overdue_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_staff()?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let (loans, total) = state.services.loans.overdue_loans(page, limit).await?;

    Ok(Json(PaginatedResponse {
        items: loans,
        total,
        page,
        limit,
    }))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Book not available, loan cap reached or overdue loans"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let loan = state
        .services
        .loans
        .create_loan(claims.user_id, request.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed book. Members may only return their own loans.
#[utoipa::path(
    put,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LoanDetails),
        (status = 400, description = "Loan is not active"),
        (status = 403, description = "Member returning another user's loan"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.return_loan(loan_id, &claims).await?;
    Ok(Json(loan))
}
