//! Catalog management service: books and categories

use crate::{
    error::{AppError, AppResult, BusinessRuleKind},
    models::{
        book::{BookDetails, BookQuery, CreateBook, UpdateBook},
        category::{Category, CategoryWithBooks, CreateCategory, UpdateCategory},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Categories

    /// List all categories with book counts
    pub async fn list_categories(&self) -> AppResult<Vec<CategoryWithBooks>> {
        self.repository.categories.list_with_book_counts().await
    }

    /// Get category by ID
    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    /// Create a new category with a unique name
    pub async fn create_category(&self, category: CreateCategory) -> AppResult<Category> {
        if self.repository.categories.name_exists(&category.name, None).await? {
            return Err(AppError::Conflict(format!(
                "Category with name '{}' already exists",
                category.name
            )));
        }

        self.repository.categories.create(&category).await
    }

    /// Update an existing category
    pub async fn update_category(&self, id: i32, category: UpdateCategory) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await?;

        if let Some(ref name) = category.name {
            if self.repository.categories.name_exists(name, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "Category with name '{}' already exists",
                    name
                )));
            }
        }

        self.repository.categories.update(id, &category).await
    }

    /// Delete a category. Blocked while books are linked to it.
    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repository.categories.get_by_id(id).await?;

        let book_count = self.repository.categories.count_books(id).await?;
        if book_count > 0 {
            return Err(AppError::rule(
                BusinessRuleKind::Other,
                format!(
                    "Cannot delete category. {} book(s) are linked to this category",
                    book_count
                ),
            ));
        }

        self.repository.categories.delete(id).await
    }

    // Books

    /// Search books with filters and pagination
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get book with category by ID
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    /// Add a new book. ISBN must be unique and the category must exist;
    /// available starts equal to quantity.
    pub async fn create_book(&self, book: CreateBook) -> AppResult<BookDetails> {
        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Conflict(format!(
                "Book with ISBN '{}' already exists",
                book.isbn
            )));
        }

        match self.repository.categories.get_by_id(book.category_id).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                return Err(AppError::BadRequest(format!(
                    "Category with id {} not found",
                    book.category_id
                )))
            }
            Err(e) => return Err(e),
        }

        self.repository.books.create(&book).await
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<BookDetails> {
        self.repository.books.get_by_id(id).await?;

        if let Some(ref isbn) = book.isbn {
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "Book with ISBN '{}' already exists",
                    isbn
                )));
            }
        }

        if let Some(category_id) = book.category_id {
            match self.repository.categories.get_by_id(category_id).await {
                Ok(_) => {}
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::BadRequest(format!(
                        "Category with id {} not found",
                        category_id
                    )))
                }
                Err(e) => return Err(e),
            }
        }

        self.repository.books.update(id, &book).await
    }

    /// Delete a book. Blocked while active loans exist against it.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.get_by_id(id).await?;

        let active_loans = self.repository.loans.count_active_for_book(id).await?;
        if active_loans > 0 {
            return Err(AppError::rule(
                BusinessRuleKind::Other,
                format!(
                    "Cannot delete book. {} active loan(s) exist for this book",
                    active_loans
                ),
            ));
        }

        self.repository.books.delete(id).await
    }
}
