//! Loan management service: the borrow/return rules engine

use chrono::{Duration, Utc};

use crate::{
    error::{AppError, AppResult, BusinessRuleKind},
    models::{
        loan::{LoanDetails, LoanQuery, LoanStatus},
        user::{Role, UserClaims},
    },
    repository::{loans::LoanFilter, Repository},
};

/// Loans run for two weeks
pub const LOAN_DURATION_DAYS: i64 = 14;
/// A user may hold at most this many active loans
pub const MAX_ACTIVE_LOANS: i64 = 3;

/// Borrow eligibility decision over a user's current loan counts.
/// No side effects; callers fetch the counts and enforce the verdict.
pub fn check_borrow_eligibility(active_loans: i64, overdue_loans: i64) -> AppResult<()> {
    if active_loans >= MAX_ACTIVE_LOANS {
        return Err(AppError::rule(
            BusinessRuleKind::MaxLoansReached,
            format!(
                "User already has {} active loans. Please return a book before borrowing another.",
                MAX_ACTIVE_LOANS
            ),
        ));
    }

    if overdue_loans > 0 {
        return Err(AppError::rule(
            BusinessRuleKind::OverdueLoans,
            "User has overdue loans. Please return overdue books before borrowing new ones."
                .to_string(),
        ));
    }

    Ok(())
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow a book for the authenticated user.
    ///
    /// Checks run in order: book exists and has copies, loan cap, overdue
    /// block. Nothing is mutated until all pass; the decrement and the
    /// insert then commit together.
    pub async fn create_loan(&self, user_id: i32, book_id: i32) -> AppResult<LoanDetails> {
        let book = self.repository.books.get_by_id(book_id).await?;
        if book.available <= 0 {
            return Err(AppError::rule(
                BusinessRuleKind::BookNotAvailable,
                "Book not available for loan".to_string(),
            ));
        }

        let active = self.repository.loans.count_active_for_user(user_id).await?;
        let overdue = self.repository.loans.count_overdue_for_user(user_id).await?;
        check_borrow_eligibility(active, overdue)?;

        let loan_date = Utc::now();
        let due_date = loan_date + Duration::days(LOAN_DURATION_DAYS);

        let loan_id = self
            .repository
            .loans
            .create(user_id, book_id, loan_date, due_date)
            .await?;

        self.repository.loans.get_details(loan_id).await
    }

    /// Return a borrowed book. Members may only return their own loans.
    pub async fn return_loan(&self, loan_id: i32, claims: &UserClaims) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;

        if claims.role == Role::Member && loan.user_id != claims.user_id {
            return Err(AppError::Authorization(
                "You can only return your own loans".to_string(),
            ));
        }

        self.repository.loans.return_loan(loan_id, Utc::now()).await?;
        self.repository.loans.get_details(loan_id).await
    }

    /// List loans. Members see only their own; staff see everything and
    /// may filter by user.
    pub async fn list_loans(
        &self,
        query: &LoanQuery,
        claims: &UserClaims,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let user_filter = if claims.role == Role::Member {
            if let Some(user_id) = query.user_id {
                if user_id != claims.user_id {
                    return Err(AppError::Authorization(
                        "Members can only view their own loans".to_string(),
                    ));
                }
            }
            Some(claims.user_id)
        } else {
            query.user_id
        };

        let status = match query.status.as_deref() {
            Some(s) => Some(s.parse::<LoanStatus>().map_err(|_| {
                AppError::Validation(
                    "Invalid status filter. Use: active, returned, or overdue".to_string(),
                )
            })?),
            None => None,
        };

        let filter = LoanFilter {
            user_id: user_filter,
            book_id: query.book_id,
            status,
        };

        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);

        self.repository.loans.list(&filter, page, limit).await
    }

    /// Current user's loans, newest first
    pub async fn my_loans(
        &self,
        user_id: i32,
        page: i64,
        limit: i64,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let filter = LoanFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        self.repository.loans.list(&filter, page, limit).await
    }

    /// All overdue loans, most urgent first (staff only, checked at the API)
    pub async fn overdue_loans(&self, page: i64, limit: i64) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.loans.list_overdue(page, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_below_cap_with_no_overdue_can_borrow() {
        assert!(check_borrow_eligibility(0, 0).is_ok());
        assert!(check_borrow_eligibility(2, 0).is_ok());
    }

    #[test]
    fn user_at_loan_cap_cannot_borrow() {
        let err = check_borrow_eligibility(3, 0).unwrap_err();
        assert!(matches!(
            err,
            AppError::BusinessRule(BusinessRuleKind::MaxLoansReached, _)
        ));
        // Above the cap is equally blocked
        assert!(check_borrow_eligibility(4, 0).is_err());
    }

    #[test]
    fn user_with_overdue_loan_cannot_borrow() {
        let err = check_borrow_eligibility(1, 1).unwrap_err();
        assert!(matches!(
            err,
            AppError::BusinessRule(BusinessRuleKind::OverdueLoans, _)
        ));
    }

    #[test]
    fn loan_cap_checked_before_overdue_block() {
        // Both violated: the cap message wins, matching check order
        let err = check_borrow_eligibility(3, 2).unwrap_err();
        assert!(matches!(
            err,
            AppError::BusinessRule(BusinessRuleKind::MaxLoansReached, _)
        ));
    }

    #[test]
    fn due_date_is_fourteen_days_out() {
        let loan_date = Utc::now();
        let due_date = loan_date + Duration::days(LOAN_DURATION_DAYS);
        assert_eq!((due_date - loan_date).num_days(), 14);
    }
}
