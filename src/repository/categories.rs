//! Categories repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CategoryWithBooks, CreateCategory, UpdateCategory},
};

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    /// List all categories with their book counts
    pub async fn list_with_book_counts(&self) -> AppResult<Vec<CategoryWithBooks>> {
        let categories = sqlx::query_as::<_, CategoryWithBooks>(
            r#"
            SELECT c.id, c.name, c.description,
                   (SELECT COUNT(*) FROM books b WHERE b.category_id = c.id) as book_count
            FROM categories c
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Check if a category name already exists
    pub async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE name = $1 AND id != $2)",
            )
            .bind(name)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Count books linked to a category
    pub async fn count_books(&self, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Create a new category
    pub async fn create(&self, category: &CreateCategory) -> AppResult<Category> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update an existing category
    pub async fn update(&self, id: i32, category: &UpdateCategory) -> AppResult<Category> {
        let current = self.get_by_id(id).await?;

        let name = category.name.as_ref().unwrap_or(&current.name);
        let description = match &category.description {
            Some(d) => Some(d.clone()),
            None => current.description.clone(),
        };

        sqlx::query("UPDATE categories SET name = $1, description = $2 WHERE id = $3")
            .bind(name)
            .bind(&description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_by_id(id).await
    }

    /// Delete a category
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }

        Ok(())
    }
}
