//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult, BusinessRuleKind},
    models::{
        book::CategoryRef,
        loan::{Loan, LoanBook, LoanDetails, LoanStatus, LoanUser},
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.book_id, l.user_id, l.loan_date, l.due_date, l.return_date, l.status,
           b.isbn, b.title, b.author, b.category_id, c.name as category_name,
           u.username, u.email
    FROM loans l
    JOIN books b ON l.book_id = b.id
    JOIN categories c ON b.category_id = c.id
    JOIN users u ON l.user_id = u.id
"#;

fn details_from_row(row: &sqlx::postgres::PgRow, now: DateTime<Utc>) -> LoanDetails {
    let loan = Loan {
        id: row.get("id"),
        book_id: row.get("book_id"),
        user_id: row.get("user_id"),
        loan_date: row.get("loan_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        status: row.get("status"),
    };

    LoanDetails {
        id: loan.id,
        loan_date: loan.loan_date,
        due_date: loan.due_date,
        return_date: loan.return_date,
        status: loan.reported_status(now),
        book: LoanBook {
            id: loan.book_id,
            isbn: row.get("isbn"),
            title: row.get("title"),
            author: row.get("author"),
            category: CategoryRef {
                id: row.get("category_id"),
                name: row.get("category_name"),
            },
        },
        user: LoanUser {
            id: loan.user_id,
            username: row.get("username"),
            email: row.get("email"),
        },
    }
}

/// Filters accepted by [`LoansRepository::list`]
#[derive(Debug, Default)]
pub struct LoanFilter {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<LoanStatus>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get loan with book and user details
    pub async fn get_details(&self, id: i32) -> AppResult<LoanDetails> {
        let query = format!("{} WHERE l.id = $1", DETAILS_SELECT);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        Ok(details_from_row(&row, Utc::now()))
    }

    /// List loans matching the filter, newest first
    pub async fn list(&self, filter: &LoanFilter, page: i64, limit: i64) -> AppResult<(Vec<LoanDetails>, i64)> {
        let offset = (page - 1) * limit;

        let mut conditions = Vec::new();

        if let Some(user_id) = filter.user_id {
            conditions.push(format!("l.user_id = {}", user_id));
        }
        if let Some(book_id) = filter.book_id {
            conditions.push(format!("l.book_id = {}", book_id));
        }
        match filter.status {
            // Overdue is a read-time predicate, not a stored state
            Some(LoanStatus::Overdue) => {
                conditions.push("l.status = 'active' AND l.due_date < NOW()".to_string());
            }
            Some(status) => conditions.push(format!("l.status = '{}'", status.as_str())),
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM loans l {}", where_clause);
        let total: i64 = sqlx::query_scalar(&count_query).fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY l.loan_date DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, limit, offset
        );
        let rows = sqlx::query(&select_query).fetch_all(&self.pool).await?;

        let now = Utc::now();
        let loans = rows.iter().map(|row| details_from_row(row, now)).collect();

        Ok((loans, total))
    }

    /// List overdue loans (active and past due), most urgent first
    pub async fn list_overdue(&self, page: i64, limit: i64) -> AppResult<(Vec<LoanDetails>, i64)> {
        let offset = (page - 1) * limit;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'active' AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;

        let select_query = format!(
            "{} WHERE l.status = 'active' AND l.due_date < NOW() ORDER BY l.due_date ASC LIMIT {} OFFSET {}",
            DETAILS_SELECT, limit, offset
        );
        let rows = sqlx::query(&select_query).fetch_all(&self.pool).await?;

        let now = Utc::now();
        let loans = rows.iter().map(|row| details_from_row(row, now)).collect();

        Ok((loans, total))
    }

    /// Count a user's active loans
    pub async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count a user's overdue loans
    pub async fn count_overdue_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND status = 'active' AND due_date < NOW()",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count all loans a user has ever taken
    pub async fn count_total_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count active loans against a book
    pub async fn count_active_for_book(&self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'active'",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Create a loan and decrement the book's availability in one
    /// transaction. The decrement is guarded by `available > 0`, so two
    /// racing creations against a single remaining copy cannot drive
    /// availability negative.
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let decremented = sqlx::query(
            "UPDATE books SET available = available - 1 WHERE id = $1 AND available > 0",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::rule(
                BusinessRuleKind::BookNotAvailable,
                "Book not available for loan".to_string(),
            ));
        }

        let loan_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (book_id, user_id, loan_date, due_date, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING id
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(loan_date)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(loan_id)
    }

    /// Mark a loan returned and increment the book's availability in one
    /// transaction. Only an active loan can be returned.
    pub async fn return_loan(&self, loan_id: i32, now: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let book_id: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE loans SET status = 'returned', return_date = $1
            WHERE id = $2 AND status = 'active'
            RETURNING book_id
            "#,
        )
        .bind(now)
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(book_id) = book_id else {
            tx.rollback().await?;
            // Distinguish a missing loan from one in the wrong state
            return match self.get_by_id(loan_id).await {
                Ok(loan) => Err(AppError::rule(
                    BusinessRuleKind::LoanNotActive,
                    format!("Loan is not active (current status: {})", loan.status),
                )),
                Err(e) => Err(e),
            };
        };

        // Clamped so a concurrent quantity decrease cannot push available
        // above quantity
        sqlx::query("UPDATE books SET available = LEAST(quantity, available + 1) WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
