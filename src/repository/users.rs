//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{RegisterUser, Role, User, UserQuery},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username (primary authentication method)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// List users with optional role filter and pagination
    pub async fn list(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let total: i64 = match query.role {
            Some(role) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
                    .bind(role)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        let users = match query.role {
            Some(role) => {
                sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE role = $1 ORDER BY id LIMIT $2 OFFSET $3",
                )
                .bind(role)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok((users, total))
    }

    /// Create a new user with an already-hashed password
    pub async fn create(&self, user: &RegisterUser, password_hash: &str, role: Role) -> AppResult<User> {
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (username, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update a user's role
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        let updated = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        self.get_by_id(id).await
    }
}
