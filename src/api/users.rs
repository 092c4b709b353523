//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::user::{UpdateRole, User, UserQuery, UserStats},
};

use super::{books::PaginatedResponse, AuthenticatedUser};

/// List users with optional role filter (admin only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("role" = Option<String>, Query, description = "Filter by role: admin, librarian or member"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default: 10)")
    ),
    responses(
        (status = 200, description = "List of users", body = PaginatedResponse<User>),
        (status = 403, description = "Not admin")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    claims.require_admin()?;

    let (users, total) = state.services.users.list_users(&query).await?;

    Ok(Json(PaginatedResponse {
        items: users,
        total,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(10),
    }))
}

/// Get user details by ID (admin, or the user themselves)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not allowed to view this user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_user(id, &claims).await?;
    Ok(Json(user))
}

/// Update a user's role (admin only)
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Not admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRole>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.update_role(id, payload.role).await?;
    Ok(Json(user))
}

/// Get loan statistics for a user (staff any, members only themselves)
#[utoipa::path(
    get,
    path = "/users/{id}/stats",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User statistics", body = UserStats),
        (status = 403, description = "Not allowed to view these statistics"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserStats>> {
    let stats = state.services.users.get_stats(id, &claims).await?;
    Ok(Json(stats))
}
