//! Integration tests for plans, subscriptions, ticket unlocks and purchases.
//!
//! Run with: TEST_DATABASE_URL=postgres://... cargo test --test commerce_integration -- --ignored

mod common;

use axum::http::{Method, StatusCode};
use common::{short_id, TestApp, TestUser};
use serde_json::{json, Value};

/// A published premium prompt costing `tickets`.
async fn premium_prompt(app: &TestApp, tickets: i32) -> (String, TestUser) {
    let (prompt, owner) = app
        .published_prompt(json!({ "is_premium": true, "ticket_cost": tickets, "price_cents": 25_000 }))
        .await;
    (prompt["slug"].as_str().unwrap().to_string(), owner)
}

async fn subscribe(app: &TestApp, user: &TestUser, plan: &str) -> Value {
    let (status, subscription) = app
        .send(
            Method::POST,
            &format!("/api/v1/plans/{}/subscribe", plan),
            user.token(),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "subscribe failed: {}", subscription);
    subscription
}

async fn unlock(app: &TestApp, user: &TestUser, slug: &str) -> (StatusCode, Value) {
    app.send(
        Method::POST,
        &format!("/api/v1/prompts/{}/unlock", slug),
        user.token(),
        None,
    )
    .await
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_public_plan_listing() {
    let app = TestApp::new().await;
    let (status, plans) = app.get("/api/v1/plans", None).await;
    assert_eq!(status, StatusCode::OK);

    let codes: Vec<&str> = plans
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["code"].as_str())
        .collect();
    for code in ["FREE", "BASIC_MONTH", "PRO_MONTH"] {
        assert!(codes.contains(&code), "missing plan {}", code);
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_plan_management_needs_grant() {
    let app = TestApp::new().await;
    let member = app.register().await;
    let (status, _) = app
        .post(
            "/api/v1/plans",
            member.token(),
            json!({
                "name": "Cheap",
                "code": format!("CHEAP_{}", short_id()),
                "plan_type": "basic",
                "duration_days": 7,
                "ticket_amount": 10,
                "price_cents": 100,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_resubscribing_carries_tickets_over() {
    let app = TestApp::new().await;
    let user = app.register().await;

    let (status, _) = app.get("/api/v1/subscriptions/me", user.token()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let free = subscribe(&app, &user, "FREE").await;
    assert_eq!(free["plan_code"], "FREE");
    assert_eq!(free["ticket_balance"], 5);
    assert_eq!(free["status"], "active");

    let pro = subscribe(&app, &user, "PRO_MONTH").await;
    assert_eq!(pro["ticket_balance"], 205);
    assert_eq!(pro["can_access_premium"], true);

    let (status, current) = app.get("/api/v1/subscriptions/me", user.token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["id"], pro["id"]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_premium_content_is_locked_until_unlocked() {
    let app = TestApp::new().await;
    let reader = app.register().await;
    let (slug, owner) = premium_prompt(&app, 3).await;
    let detail_uri = format!("/api/v1/prompts/{}", slug);

    let (status, detail) = app.get(&detail_uri, reader.token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["locked"], true);
    assert!(detail["content"].is_null());

    // The creator always sees their own content
    let (_, own) = app.get(&detail_uri, owner.token()).await;
    assert_eq!(own["locked"], false);

    subscribe(&app, &reader, "PRO_MONTH").await;
    let (status, access) = app
        .get(&format!("/api/v1/prompts/{}/access", slug), reader.token())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(access["granted"], true);
    assert_eq!(access["reason"], "subscription");

    // Subscription access still has to be spent before the content shows
    let (_, detail) = app.get(&detail_uri, reader.token()).await;
    assert_eq!(detail["locked"], true);

    let (status, unlocked) = unlock(&app, &reader, &slug).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unlocked["purchase"]["tickets_spent"], 3);
    assert_eq!(unlocked["purchase"]["price_paid_cents"], 0);
    assert_eq!(unlocked["tickets_remaining"], 197);

    let (_, detail) = app.get(&detail_uri, reader.token()).await;
    assert_eq!(detail["locked"], false);

    // A second unlock is free
    let (status, again) = unlock(&app, &reader, &slug).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["decision"]["reason"], "already_purchased");
    assert!(again["purchase"].is_null());

    let (_, subscription) = app.get("/api/v1/subscriptions/me", reader.token()).await;
    assert_eq!(subscription["ticket_balance"], 197);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_unlock_refusals() {
    let app = TestApp::new().await;
    let admin = app.register_with_role("ADMIN").await;
    let (slug, _) = premium_prompt(&app, 3).await;

    let no_plan = app.register().await;
    let (status, body) = unlock(&app, &no_plan, &slug).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "payment_required");

    let free_plan = app.register().await;
    subscribe(&app, &free_plan, "FREE").await;
    let (status, _) = unlock(&app, &free_plan, &slug).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let plan_code = format!("TINY_{}", short_id());
    let (status, plan) = app
        .post(
            "/api/v1/plans",
            admin.token(),
            json!({
                "name": "Tiny premium",
                "code": plan_code,
                "plan_type": "pro",
                "duration_days": 7,
                "ticket_amount": 1,
                "price_cents": 1_000,
                "can_access_premium": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "plan creation failed: {}", plan);

    let short = app.register().await;
    subscribe(&app, &short, &plan_code).await;
    let (status, body) = unlock(&app, &short, &slug).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["message"].as_str().unwrap().contains('3'));

    let (_, subscription) = app.get("/api/v1/subscriptions/me", short.token()).await;
    assert_eq!(subscription["ticket_balance"], 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_direct_purchase_once_per_prompt() {
    let app = TestApp::new().await;
    let buyer = app.register().await;
    let (slug, owner) = premium_prompt(&app, 3).await;
    let uri = format!("/api/v1/prompts/{}/purchase", slug);

    let (status, purchase) = app.send(Method::POST, &uri, buyer.token(), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["price_paid_cents"], 25_000);
    assert_eq!(purchase["tickets_spent"], 0);
    assert!(!purchase["transaction_id"].as_str().unwrap().is_empty());

    let (status, _) = app.send(Method::POST, &uri, buyer.token(), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.send(Method::POST, &uri, owner.token(), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, history) = app.get("/api/v1/users/me/purchases", buyer.token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 1);
    assert_eq!(history["items"][0]["prompt_slug"], slug);

    let (_, detail) = app.get(&format!("/api/v1/prompts/{}", slug), buyer.token()).await;
    assert_eq!(detail["locked"], false);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_buyer_cannot_choose_purchase_price() {
    let app = TestApp::new().await;
    let buyer = app.register().await;
    let (slug, _) = premium_prompt(&app, 3).await;
    let uri = format!("/api/v1/prompts/{}/purchase", slug);

    let (status, body) = app
        .post(&uri, buyer.token(), json!({ "price_paid_cents": 0 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .post(&uri, buyer.token(), json!({ "price_paid_cents": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Restating the listed price is fine
    let (status, purchase) = app
        .post(&uri, buyer.token(), json!({ "price_paid_cents": 25_000 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["price_paid_cents"], 25_000);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_commerce_manager_records_explicit_price() {
    let app = TestApp::new().await;
    let admin = app.register_with_role("ADMIN").await;
    let (slug, _) = premium_prompt(&app, 3).await;

    let (status, purchase) = app
        .post(
            &format!("/api/v1/prompts/{}/purchase", slug),
            admin.token(),
            json!({ "price_paid_cents": 12_500 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "purchase failed: {}", purchase);
    assert_eq!(purchase["price_paid_cents"], 12_500);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_purchased_prompt_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = app.register_with_role("ADMIN").await;
    let buyer = app.register().await;
    let (slug, _) = premium_prompt(&app, 1).await;

    app.send(
        Method::POST,
        &format!("/api/v1/prompts/{}/purchase", slug),
        buyer.token(),
        None,
    )
    .await;

    let (status, _) = app
        .delete(&format!("/api/v1/prompts/{}", slug), admin.token())
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_guest_access_check() {
    let app = TestApp::new().await;
    let (slug, _) = premium_prompt(&app, 2).await;

    let (status, access) = app
        .get(&format!("/api/v1/prompts/{}/access", slug), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(access["granted"], false);
    assert_eq!(access["reason"], "no_subscription");
    assert_eq!(access["ticket_cost"], 2);
}
