//! User management service

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, User, UserClaims, UserQuery, UserStats},
    repository::Repository,
    services::loans::check_borrow_eligibility,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List users with optional role filter (admin only, checked at the API)
    pub async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.list(query).await
    }

    /// Get a user. Admins may read anyone; everyone else only themselves.
    pub async fn get_user(&self, id: i32, claims: &UserClaims) -> AppResult<User> {
        if !claims.is_admin() && claims.user_id != id {
            return Err(AppError::Authorization(
                "You can only view your own profile".to_string(),
            ));
        }

        self.repository.users.get_by_id(id).await
    }

    /// Update a user's role (admin only, checked at the API)
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        self.repository.users.update_role(id, role).await
    }

    /// Loan statistics for a user. Staff may read anyone; members only
    /// themselves.
    pub async fn get_stats(&self, id: i32, claims: &UserClaims) -> AppResult<UserStats> {
        if claims.role == Role::Member && claims.user_id != id {
            return Err(AppError::Authorization(
                "You can only view your own statistics".to_string(),
            ));
        }

        // Verify user exists
        self.repository.users.get_by_id(id).await?;

        let active_loans = self.repository.loans.count_active_for_user(id).await?;
        let total_loans = self.repository.loans.count_total_for_user(id).await?;
        let overdue_loans = self.repository.loans.count_overdue_for_user(id).await?;

        Ok(UserStats {
            active_loans,
            total_loans,
            overdue_loans,
            can_borrow: check_borrow_eligibility(active_loans, overdue_loans).is_ok(),
        })
    }
}
