//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{RegisterUser, User},
};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response with bearer token
#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already registered")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(payload): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state.services.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in and receive a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenResponse),
        (status = 401, description = "Incorrect username or password")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let (token, _user) = state
        .services
        .auth
        .authenticate(&payload.username, &payload.password)
        .await?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.auth.get_by_id(claims.user_id).await?;
    Ok(Json(user))
}
