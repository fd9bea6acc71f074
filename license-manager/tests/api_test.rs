//! HTTP API tests

mod common;

use axum::http::{HeaderName, HeaderValue};
use chrono::Duration;
use common::{admin_header, create_test_server};
use serde_json::{json, Value};

const ADMIN_KEY: &str = "s3cret";

async fn create_token(server: &axum_test::TestServer) -> String {
    let (name, value) = admin_header(ADMIN_KEY);
    let response = server
        .post("/api/tokens")
        .add_header(name, value)
        .json(&json!({
            "email": "ana@example.com",
            "name": "Ana Lopez",
            "phone": "555 123 4567",
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    body["token"]["token"].as_str().unwrap().to_string()
}

/// Test: the status endpoint answers
#[tokio::test]
async fn test_status() {
    let (server, _, _) = create_test_server(None);

    let response = server.get("/api/status").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["message"], "API running");
}

/// Test: validate requires both token and machineId
#[tokio::test]
async fn test_validate_requires_fields() {
    let (server, _, _) = create_test_server(None);

    let response = server
        .post("/api/validate")
        .json(&json!({ "token": "abc" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Token and machineId are required");
}

/// Test: an unknown token is a 200 with success false
#[tokio::test]
async fn test_validate_unknown_token() {
    let (server, _, _) = create_test_server(None);

    let response = server
        .post("/api/validate")
        .json(&json!({ "token": "0123456789abcdef0123456789abcdef", "machineId": "dev-1" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Token not found");
}

/// Test: create, check, redeem, then a second device is refused
#[tokio::test]
async fn test_redemption_flow() {
    let (server, _, _) = create_test_server(Some(ADMIN_KEY));
    let token = create_token(&server).await;

    let response = server.get(&format!("/api/check-validity/{}", token)).await;
    let body: Value = response.json();
    assert_eq!(body["valid"], true);

    let response = server
        .post("/api/validate")
        .add_header(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("203.0.113.7"),
        )
        .json(&json!({ "token": token, "machineId": "dev-1", "deviceInfo": "laptop" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Token validated and activated");
    assert_eq!(body["expiresAt"], "2025-02-01T00:00:00Z");
    assert!(body.get("machineId").is_none());

    let response = server
        .post("/api/validate")
        .json(&json!({ "token": token, "machineId": "dev-2" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Token has already been redeemed");
    assert!(body["redeemedAt"].is_string());
}

/// Test: an expired token reports its expiry
#[tokio::test]
async fn test_validate_expired() {
    let (server, _, clock) = create_test_server(None);
    let token = create_token(&server).await;

    clock.advance(Duration::days(30));

    let response = server.get(&format!("/api/check-validity/{}", token)).await;
    let body: Value = response.json();
    assert_eq!(body["valid"], false);

    let response = server
        .post("/api/validate")
        .json(&json!({ "token": token, "machineId": "dev-1" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Token expired");
    assert_eq!(body["expiresAt"], "2025-02-01T00:00:00Z");
}

/// Test: admin routes need the key when one is configured
#[tokio::test]
async fn test_admin_key_required() {
    let (server, _, _) = create_test_server(Some(ADMIN_KEY));

    let response = server.get("/api/tokens").await;
    assert_eq!(response.status_code(), 401);

    let (name, _) = admin_header(ADMIN_KEY);
    let response = server
        .get("/api/tokens")
        .add_header(name, HeaderValue::from_static("wrong"))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = server
        .post("/api/tokens")
        .json(&json!({ "email": "a@b.com", "name": "Ana", "phone": "5551234567" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Test: admin routes are open when no key is configured
#[tokio::test]
async fn test_admin_open_without_key() {
    let (server, _, _) = create_test_server(None);

    let response = server.get("/api/tokens").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["totalPages"], 0);
}

/// Test: invalid owner data is a 400
#[tokio::test]
async fn test_create_invalid_owner() {
    let (server, _, _) = create_test_server(None);

    let response = server
        .post("/api/tokens")
        .json(&json!({ "email": "not-an-email", "name": "Ana Lopez", "phone": "5551234567" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

/// Test: created tokens come back with share links
#[tokio::test]
async fn test_create_returns_share_links() {
    let (server, _, _) = create_test_server(None);

    let response = server
        .post("/api/tokens")
        .json(&json!({ "email": "ana@example.com", "name": "Ana Lopez", "phone": "5551234567" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["shareLinks"].as_array().unwrap().len(), 3);
    assert_eq!(body["token"]["ownerPhone"], "5551234567");
    assert_eq!(body["token"]["redeemed"], false);
    assert_eq!(body["token"]["remainingDays"], 17);
    assert!(body["token"].get("boundDeviceId").is_none());
}

/// Test: token listing pages by five
#[tokio::test]
async fn test_list_tokens_pagination() {
    let (server, _, _) = create_test_server(None);
    for _ in 0..7 {
        create_token(&server).await;
    }

    let response = server.get("/api/tokens").await;
    let body: Value = response.json();
    assert_eq!(body["tokens"].as_array().unwrap().len(), 5);
    assert_eq!(body["totalPages"], 2);

    let response = server.get("/api/tokens?page=2").await;
    let body: Value = response.json();
    assert_eq!(body["tokens"].as_array().unwrap().len(), 2);
    assert_eq!(body["currentPage"], 2);
}

/// Test: renewal extends expiry and validates its input
#[tokio::test]
async fn test_renew() {
    let (server, _, _) = create_test_server(None);
    let token = create_token(&server).await;

    let response = server
        .post(&format!("/api/tokens/{}/renew", token))
        .json(&json!({ "months": 2 }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["token"]["expiresAt"], "2025-04-01T00:00:00Z");

    let response = server
        .post(&format!("/api/tokens/{}/renew", token))
        .json(&json!({ "months": 0 }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/api/tokens/0123456789abcdef0123456789abcdef/renew")
        .json(&json!({ "months": 1 }))
        .await;
    assert_eq!(response.status_code(), 404);
}

/// Test: expiring and expired listings follow the clock
#[tokio::test]
async fn test_expiring_and_expired() {
    let (server, _, clock) = create_test_server(None);
    let token = create_token(&server).await;

    server
        .post("/api/validate")
        .json(&json!({ "token": token, "machineId": "dev-1" }))
        .await;

    let response = server.get("/api/tokens/expiring").await;
    let body: Value = response.json();
    assert!(body["tokens"].as_array().unwrap().is_empty());

    let response = server.get("/api/tokens/expiring?days=30").await;
    let body: Value = response.json();
    assert_eq!(body["tokens"][0]["token"], token.as_str());

    clock.advance(Duration::days(20));
    let response = server.get("/api/tokens/expired").await;
    let body: Value = response.json();
    assert_eq!(body["tokens"][0]["token"], token.as_str());
    assert_eq!(body["tokens"][0]["active"], false);
}

/// Test: chat messages drive the dialogue
#[tokio::test]
async fn test_chat_bridge() {
    let (server, notifier, _) = create_test_server(None);

    let response = server
        .post("/chat/messages")
        .json(&json!({ "chatId": "42", "text": "hello" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["handled"], false);

    for text in ["/new_token", "ana@example.com", "Ana Lopez", "5551234567"] {
        let response = server
            .post("/chat/messages")
            .json(&json!({ "chatId": "42", "text": text }))
            .await;
        let body: Value = response.json();
        assert_eq!(body["handled"], true);
    }

    let share = notifier.messages_for("42").pop().unwrap();
    assert_eq!(share.attachments.len(), 3);

    let response = server.get("/api/tokens").await;
    let body: Value = response.json();
    assert_eq!(body["tokens"].as_array().unwrap().len(), 1);
}

/// Test: page 0 reads as page 1 and a huge page is simply empty
#[tokio::test]
async fn test_list_tokens_page_bounds() {
    let (server, _, _) = create_test_server(None);
    create_token(&server).await;

    let response = server.get("/api/tokens?page=0").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["tokens"].as_array().unwrap().len(), 1);

    let response = server.get("/api/tokens?page=18446744073709551615").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["currentPage"], u64::MAX);
    assert!(body["tokens"].as_array().unwrap().is_empty());
    assert_eq!(body["totalPages"], 1);
}

/// Test: the widest expiring window saturates instead of failing
#[tokio::test]
async fn test_expiring_widest_window() {
    let (server, _, _) = create_test_server(None);
    let token = create_token(&server).await;
    server
        .post("/api/validate")
        .json(&json!({ "token": token, "machineId": "dev-1" }))
        .await;

    let response = server.get("/api/tokens/expiring?days=4294967295").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["tokens"][0]["token"], token.as_str());
}

/// Test: the chat bridge needs the admin key when one is configured
#[tokio::test]
async fn test_chat_bridge_requires_admin_key() {
    let (server, notifier, _) = create_test_server(Some(ADMIN_KEY));

    for text in ["/new_token", "ana@example.com", "Ana Lopez", "5551234567"] {
        let response = server
            .post("/chat/messages")
            .json(&json!({ "chatId": "42", "text": text }))
            .await;
        assert_eq!(response.status_code(), 401);
    }
    assert_eq!(notifier.count(), 0);

    let (name, value) = admin_header(ADMIN_KEY);
    let response = server.get("/api/tokens").add_header(name, value).await;
    let body: Value = response.json();
    assert!(body["tokens"].as_array().unwrap().is_empty());

    let (name, value) = admin_header(ADMIN_KEY);
    let response = server
        .post("/chat/messages")
        .add_header(name, value)
        .json(&json!({ "chatId": "42", "text": "/ping" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["handled"], true);
    assert_eq!(notifier.last_text("42").as_deref(), Some("pong!"));
}
