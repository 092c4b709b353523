//! Authentication service: password hashing, registration, JWT issuance

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterUser, Role, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new user. New accounts always start as members; role
    /// changes go through the admin role endpoint.
    pub async fn register(&self, user: RegisterUser) -> AppResult<User> {
        if self.repository.users.username_exists(&user.username).await? {
            return Err(AppError::Conflict("Username already registered".to_string()));
        }

        if self.repository.users.email_exists(&user.email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(&user.password)?;

        self.repository
            .users
            .create(&user, &password_hash, Role::Member)
            .await
    }

    /// Authenticate by username and return a JWT token with the user
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Incorrect username or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Incorrect username or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;

        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }
}
