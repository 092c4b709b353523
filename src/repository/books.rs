//! Books repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::book::{adjust_available, Book, BookDetails, BookQuery, CategoryRef, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

fn details_from_row(row: &sqlx::postgres::PgRow) -> BookDetails {
    BookDetails {
        id: row.get("id"),
        isbn: row.get("isbn"),
        title: row.get("title"),
        author: row.get("author"),
        publisher: row.get("publisher"),
        year: row.get("year"),
        category: CategoryRef {
            id: row.get("category_id"),
            name: row.get("category_name"),
        },
        quantity: row.get("quantity"),
        available: row.get("available"),
    }
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book with its category for display
    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let row = sqlx::query(
            r#"
            SELECT b.*, c.name as category_name
            FROM books b
            JOIN categories c ON b.category_id = c.id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        Ok(details_from_row(&row))
    }

    /// Check if an ISBN already exists
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref title) = query.title {
            params.push(format!("%{}%", title.to_lowercase()));
            conditions.push(format!("LOWER(b.title) LIKE ${}", params.len()));
        }

        if let Some(ref author) = query.author {
            params.push(format!("%{}%", author.to_lowercase()));
            conditions.push(format!("LOWER(b.author) LIKE ${}", params.len()));
        }

        if let Some(category_id) = query.category_id {
            conditions.push(format!("b.category_id = {}", category_id));
        }

        if let Some(available) = query.available {
            if available {
                conditions.push("b.available > 0".to_string());
            } else {
                conditions.push("b.available = 0".to_string());
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total
        let count_query = format!("SELECT COUNT(*) FROM books b {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        // Fetch page
        let select_query = format!(
            r#"
            SELECT b.*, c.name as category_name
            FROM books b
            JOIN categories c ON b.category_id = c.id
            {}
            ORDER BY b.title
            LIMIT {} OFFSET {}
            "#,
            where_clause, limit, offset
        );

        let mut select_builder = sqlx::query(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let rows = select_builder.fetch_all(&self.pool).await?;

        let books = rows.iter().map(details_from_row).collect();

        Ok((books, total))
    }

    /// Create a new book. Available starts equal to quantity.
    pub async fn create(&self, book: &CreateBook) -> AppResult<BookDetails> {
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (isbn, title, author, publisher, year, category_id, quantity, available, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.year)
        .bind(book.category_id)
        .bind(book.quantity)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get_details(id).await
    }

    /// Update an existing book. `available` is never set directly: a
    /// quantity change shifts it by the same delta, clamped at zero.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<BookDetails> {
        let current = self.get_by_id(id).await?;

        let isbn = book.isbn.as_ref().unwrap_or(&current.isbn);
        let title = book.title.as_ref().unwrap_or(&current.title);
        let author = book.author.as_ref().unwrap_or(&current.author);
        let publisher = match &book.publisher {
            Some(p) => Some(p.clone()),
            None => current.publisher.clone(),
        };
        let year = book.year.or(current.year);
        let category_id = book.category_id.unwrap_or(current.category_id);

        let (quantity, available) = match book.quantity {
            Some(new_quantity) if new_quantity != current.quantity => (
                new_quantity,
                adjust_available(current.quantity, current.available, new_quantity),
            ),
            _ => (current.quantity, current.available),
        };

        sqlx::query(
            r#"
            UPDATE books
            SET isbn = $1, title = $2, author = $3, publisher = $4, year = $5,
                category_id = $6, quantity = $7, available = $8
            WHERE id = $9
            "#,
        )
        .bind(isbn)
        .bind(title)
        .bind(author)
        .bind(&publisher)
        .bind(year)
        .bind(category_id)
        .bind(quantity)
        .bind(available)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_details(id).await
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
