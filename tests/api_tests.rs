//! API integration tests
//!
//! These run against a live server with an `admin`/`admin123` account
//! provisioned: `cargo run`, then `cargo test -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique suffix so repeated runs don't trip the unique constraints
fn run_id() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos()
}

/// Helper to get a token for the seeded admin account
async fn get_admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin123"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["access_token"]
        .as_str()
        .expect("No access_token in response")
        .to_string()
}

/// Register a fresh member account and return (token, user_id, username)
async fn register_member(client: &Client, tag: &str) -> (String, i64, String) {
    let username = format!("{}_{}", tag, run_id());

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse register response");
    let user_id = body["id"].as_i64().expect("No user ID");
    assert_eq!(body["role"], "member");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "secret123"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    let token = body["access_token"].as_str().expect("No token").to_string();

    (token, user_id, username)
}

/// Create a category and a book with the given quantity, returning the book id
async fn create_book(client: &Client, admin_token: &str, quantity: i64) -> i64 {
    let id = run_id();

    let response = client
        .post(format!("{}/categories", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "name": format!("Fiction {}", id),
            "description": "Test category"
        }))
        .send()
        .await
        .expect("Failed to create category");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse category");
    let category_id = body["id"].as_i64().expect("No category ID");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "isbn": format!("{:013}", id % 10_000_000_000_000),
            "title": "The Test Book",
            "author": "Ada Author",
            "publisher": "Test Press",
            "year": 2020,
            "category_id": category_id,
            "quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book");
    assert_eq!(body["available"], body["quantity"]);
    body["id"].as_i64().expect("No book ID")
}

async fn get_available(client: &Client, book_id: i64) -> i64 {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to get book");
    let body: Value = response.json().await.expect("Failed to parse book");
    body["available"].as_i64().expect("No available count")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let client = Client::new();
    let (token, _, username) = register_member(&client, "login").await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], username.as_str());
    // The hash must never leak
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_username_rejected() {
    let client = Client::new();
    let (_, _, username) = register_member(&client, "dup").await;

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("other_{}@example.com", run_id()),
            "password": "secret123"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_books_are_public_but_writes_are_gated() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Member cannot create books
    let (member_token, _, _) = register_member(&client, "gate").await;
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({
            "isbn": "9780000000001",
            "title": "Forbidden",
            "author": "Nobody",
            "category_id": 1,
            "quantity": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_category_delete_blocked_by_books() {
    let client = Client::new();
    let admin_token = get_admin_token(&client).await;
    let book_id = create_book(&client, &admin_token, 1).await;

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to get book");
    let body: Value = response.json().await.expect("Failed to parse book");
    let category_id = body["category"]["id"].as_i64().expect("No category id");

    let response = client
        .delete(format!("{}/categories/{}", BASE_URL, category_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_borrow_scenario_tracks_availability() {
    let client = Client::new();
    let admin_token = get_admin_token(&client).await;

    // Book{quantity=2, available=2}, two borrowers
    let book_id = create_book(&client, &admin_token, 2).await;
    let (alice_token, _, _) = register_member(&client, "alice").await;
    let (bob_token, _, _) = register_member(&client, "bob").await;
    let (carol_token, _, _) = register_member(&client, "carol").await;

    // First loan: available 2 -> 1
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", alice_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse loan");
    let first_loan_id = loan["id"].as_i64().expect("No loan ID");
    assert_eq!(loan["status"], "active");
    assert_eq!(get_available(&client, book_id).await, 1);

    // Second loan: available 1 -> 0
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", bob_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);
    assert_eq!(get_available(&client, book_id).await, 0);

    // Third attempt: rejected, availability unchanged
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", carol_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 400);
    assert_eq!(get_available(&client, book_id).await, 0);

    // Return the first loan: available 0 -> 1
    let response = client
        .put(format!("{}/loans/{}/return", BASE_URL, first_loan_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .expect("Failed to return loan");
    assert!(response.status().is_success());
    let loan: Value = response.json().await.expect("Failed to parse loan");
    assert_eq!(loan["status"], "returned");
    assert!(loan["return_date"].is_string());
    assert_eq!(get_available(&client, book_id).await, 1);

    // Returning it again is a business-rule error
    let response = client
        .put(format!("{}/loans/{}/return", BASE_URL, first_loan_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_loan_cap_enforced() {
    let client = Client::new();
    let admin_token = get_admin_token(&client).await;
    let (member_token, _, _) = register_member(&client, "cap").await;

    // Three loans against three distinct books succeed
    for _ in 0..3 {
        let book_id = create_book(&client, &admin_token, 1).await;
        let response = client
            .post(format!("{}/loans", BASE_URL))
            .header("Authorization", format!("Bearer {}", member_token))
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .expect("Failed to create loan");
        assert_eq!(response.status(), 201);
    }

    // The fourth is rejected by the cap
    let book_id = create_book(&client, &admin_token, 1).await;
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 400);
    // Nothing was decremented for the rejected attempt
    assert_eq!(get_available(&client, book_id).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_return_another_users_loan() {
    let client = Client::new();
    let admin_token = get_admin_token(&client).await;
    let book_id = create_book(&client, &admin_token, 1).await;
    let (alice_token, _, _) = register_member(&client, "owner").await;
    let (mallory_token, _, _) = register_member(&client, "other").await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", alice_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    let loan: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan ID");

    let response = client
        .put(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", mallory_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // Staff can return anyone's loan
    let response = client
        .put(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_member_loan_listing_is_scoped() {
    let client = Client::new();
    let (member_token, user_id, _) = register_member(&client, "scope").await;

    // Filtering by someone else's id is forbidden
    let response = client
        .get(format!("{}/loans?user_id={}", BASE_URL, user_id + 1))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // Own listing works
    let response = client
        .get(format!("{}/loans/my-loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_invalid_status_filter_rejected() {
    let client = Client::new();
    let admin_token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/loans?status=lost", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_overdue_listing_requires_staff() {
    let client = Client::new();
    let (member_token, _, _) = register_member(&client, "overdue").await;

    let response = client
        .get(format!("{}/loans/overdue", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_user_stats_reflect_loans() {
    let client = Client::new();
    let admin_token = get_admin_token(&client).await;
    let book_id = create_book(&client, &admin_token, 1).await;
    let (member_token, user_id, _) = register_member(&client, "stats").await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/users/{}/stats", BASE_URL, user_id))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["active_loans"], 1);
    assert_eq!(body["overdue_loans"], 0);
    assert_eq!(body["can_borrow"], true);
}

#[tokio::test]
#[ignore]
async fn test_role_management_is_admin_only() {
    let client = Client::new();
    let admin_token = get_admin_token(&client).await;
    let (member_token, user_id, _) = register_member(&client, "promote").await;

    // Member cannot change roles
    let response = client
        .put(format!("{}/users/{}/role", BASE_URL, user_id))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "role": "librarian" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // Admin can
    let response = client
        .put(format!("{}/users/{}/role", BASE_URL, user_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "role": "librarian" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["role"], "librarian");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/loans", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
