//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Member => "member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "librarian" => Ok(Role::Librarian),
            "member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role (stored as TEXT)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// User query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Update role request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
}

/// Per-user loan statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct UserStats {
    pub active_loans: i64,
    pub total_loans: i64,
    pub overdue_loans: i64,
    pub can_borrow: bool,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Check if user is admin
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check if user is library staff (admin or librarian)
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Librarian)
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require admin or librarian privileges
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator or librarian privileges required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "alice".to_string(),
            user_id: 1,
            role,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::Librarian, Role::Member] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn staff_checks_per_role() {
        assert!(claims(Role::Admin).require_admin().is_ok());
        assert!(claims(Role::Librarian).require_admin().is_err());
        assert!(claims(Role::Librarian).require_staff().is_ok());
        assert!(claims(Role::Member).require_staff().is_err());
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let original = claims(Role::Member);
        let token = original.create_token("test-secret").unwrap();
        let decoded = UserClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.user_id, original.user_id);
        assert_eq!(decoded.role, Role::Member);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = claims(Role::Member).create_token("test-secret").unwrap();
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }
}
