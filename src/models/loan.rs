//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

use super::book::CategoryRef;

/// Loan status. Only `active` and `returned` are ever stored; `overdue`
/// is derived at read time from the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            "overdue" => Ok(LoanStatus::Overdue),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus (stored as TEXT)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl Loan {
    /// Overdue predicate: active and past due, computed on every read
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Active && self.due_date < now
    }

    /// Status as reported to callers, with overdue derived
    pub fn reported_status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.is_overdue(now) {
            LoanStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Short book representation embedded in loan responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanBook {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub category: CategoryRef,
}

/// Short user representation embedded in loan responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanUser {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// Loan with book and user details for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    /// Reported status (overdue derived from due date)
    pub status: LoanStatus,
    pub book: LoanBook,
    pub user: LoanUser,
}

/// Loan list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// Filter by status: active, returned or overdue
    pub status: Option<String>,
    /// Filter by user (admin/librarian only)
    pub user_id: Option<i32>,
    /// Filter by book
    pub book_id: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(status: LoanStatus, due_in_hours: i64) -> (Loan, DateTime<Utc>) {
        let now = Utc::now();
        let loan = Loan {
            id: 1,
            book_id: 1,
            user_id: 1,
            loan_date: now - Duration::days(7),
            due_date: now + Duration::hours(due_in_hours),
            return_date: None,
            status,
        };
        (loan, now)
    }

    #[test]
    fn active_loan_before_due_is_not_overdue() {
        let (loan, now) = loan(LoanStatus::Active, 24);
        assert!(!loan.is_overdue(now));
        assert_eq!(loan.reported_status(now), LoanStatus::Active);
    }

    #[test]
    fn active_loan_past_due_reports_overdue() {
        let (loan, now) = loan(LoanStatus::Active, -1);
        assert!(loan.is_overdue(now));
        assert_eq!(loan.reported_status(now), LoanStatus::Overdue);
    }

    #[test]
    fn returned_loan_never_overdue() {
        let (loan, now) = loan(LoanStatus::Returned, -48);
        assert!(!loan.is_overdue(now));
        assert_eq!(loan.reported_status(now), LoanStatus::Returned);
    }

    #[test]
    fn classification_flips_with_the_clock() {
        // No stored mutation: the same row reads differently as time passes
        let (loan, now) = loan(LoanStatus::Active, 1);
        assert_eq!(loan.reported_status(now), LoanStatus::Active);
        let later = now + Duration::hours(2);
        assert_eq!(loan.reported_status(later), LoanStatus::Overdue);
    }
}
