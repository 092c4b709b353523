//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, categories, health, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblioteca API",
        version = "0.1.0",
        description = "Library Management Backend REST API",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Users
        users::list_users,
        users::get_user,
        users::update_user_role,
        users::get_user_stats,
        // Loans
        loans::list_loans,
        loans::my_loans,
        loans::overdue_loans,
        loans::create_loan,
        loans::return_loan,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::TokenResponse,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateRole,
            crate::models::user::UserStats,
            // Categories
            crate::models::category::Category,
            crate::models::category::CategoryWithBooks,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            // Books
            crate::models::book::BookDetails,
            crate::models::book::CategoryRef,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Loans
            loans::CreateLoanRequest,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanBook,
            crate::models::loan::LoanUser,
            crate::models::loan::LoanStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "categories", description = "Book category management"),
        (name = "books", description = "Book catalog management"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Loan management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
