//! Error types for the biblioteca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthenticated = 2,
    NotAuthorized = 3,
    DbFailure = 4,
    NoSuchUser = 5,
    NoSuchCategory = 6,
    NoSuchBook = 7,
    NoSuchLoan = 8,
    Duplicate = 9,
    BookNotAvailable = 10,
    MaxLoansReached = 11,
    OverdueLoans = 12,
    LoanNotActive = 13,
    BadValue = 14,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {1}")]
    BusinessRule(BusinessRuleKind, String),
}

/// Which loan/catalog rule was violated; selects the error code in the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessRuleKind {
    BookNotAvailable,
    MaxLoansReached,
    OverdueLoans,
    LoanNotActive,
    Other,
}

impl std::fmt::Display for BusinessRuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BusinessRuleKind::BookNotAvailable => "book not available",
            BusinessRuleKind::MaxLoansReached => "max loans reached",
            BusinessRuleKind::OverdueLoans => "overdue loans",
            BusinessRuleKind::LoanNotActive => "loan not active",
            BusinessRuleKind::Other => "rule violation",
        };
        write!(f, "{}", s)
    }
}

impl From<BusinessRuleKind> for ErrorCode {
    fn from(kind: BusinessRuleKind) -> Self {
        match kind {
            BusinessRuleKind::BookNotAvailable => ErrorCode::BookNotAvailable,
            BusinessRuleKind::MaxLoansReached => ErrorCode::MaxLoansReached,
            BusinessRuleKind::OverdueLoans => ErrorCode::OverdueLoans,
            BusinessRuleKind::LoanNotActive => ErrorCode::LoanNotActive,
            BusinessRuleKind::Other => ErrorCode::Failure,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(kind, msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::from(*kind), msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for the loan/catalog rule violations
    pub fn rule(kind: BusinessRuleKind, msg: impl Into<String>) -> Self {
        AppError::BusinessRule(kind, msg.into())
    }
}
