//! Integration tests for the prompt catalog: lifecycle, visibility, links
//! and counters.
//!
//! Run with: TEST_DATABASE_URL=postgres://... cargo test --test prompts_integration -- --ignored

mod common;

use axum::http::{Method, StatusCode};
use common::{short_id, TestApp, TestUser};
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_tag(app: &TestApp, admin: &TestUser) -> Value {
    let (status, tag) = app
        .post(
            "/api/v1/tags",
            admin.token(),
            json!({ "name": format!("tag{}", short_id()) }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "tag creation failed: {}", tag);
    tag
}

async fn tag_usage(app: &TestApp, slug: &str) -> i64 {
    let (status, tags) = app.get(&format!("/api/v1/tags?q={}", slug), None).await;
    assert_eq!(status, StatusCode::OK);
    tags.as_array()
        .unwrap()
        .iter()
        .find(|t| t["slug"] == slug)
        .and_then(|t| t["usage_count"].as_i64())
        .expect("tag not listed")
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_new_prompt_is_a_draft_hidden_from_others() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let stranger = app.register().await;

    let prompt = app.create_prompt(&owner, json!({})).await;
    assert_eq!(prompt["status"], "draft");
    assert!(prompt["published_at"].is_null());
    assert_eq!(prompt["created_by"], owner.id.to_string());
    let uri = format!("/api/v1/prompts/{}", prompt["slug"].as_str().unwrap());

    let (status, detail) = app.get(&uri, owner.token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        detail["content"]["prompt_text"],
        "Summarize {text} in three bullet points"
    );

    let (status, _) = app.get(&uri, stranger.token()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_slug_conflicts() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let slug = format!("weekly-report-{}", short_id());

    app.create_prompt(&owner, json!({ "slug": slug })).await;
    let (status, _) = app
        .post(
            "/api/v1/prompts",
            owner.token(),
            json!({
                "title": "Weekly report",
                "slug": slug,
                "content": { "prompt_text": "Draft the weekly report" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_guest_cannot_create() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post(
            "/api/v1/prompts",
            None,
            json!({ "title": "Anon", "content": { "prompt_text": "x" } }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_review_workflow_requires_publish_grant() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let editor = app.register_with_role("EDITOR").await;
    let prompt = app.create_prompt(&owner, json!({})).await;
    let uri = format!("/api/v1/prompts/{}/status", prompt["slug"].as_str().unwrap());

    // Members cannot skip review
    let (status, _) = app
        .post(&uri, owner.token(), json!({ "status": "published" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, pending) = app
        .post(&uri, owner.token(), json!({ "status": "pending" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["status"], "pending");

    let (status, _) = app
        .post(&uri, owner.token(), json!({ "status": "published" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, published) = app
        .post(&uri, editor.token(), json!({ "status": "published" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "published");
    assert!(published["published_at"].is_string());

    // Published prompts are now public
    let (status, detail) = app
        .get(
            &format!("/api/v1/prompts/{}", prompt["slug"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["locked"], false);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_republish_keeps_first_publication_date() {
    let app = TestApp::new().await;
    let admin = app.register_with_role("ADMIN").await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let slug = prompt["slug"].as_str().unwrap();
    let uri = format!("/api/v1/prompts/{}/status", slug);

    let (_, detail) = app.get(&format!("/api/v1/prompts/{}", slug), None).await;
    let first_published = detail["prompt"]["published_at"].clone();
    assert!(first_published.is_string());

    let (status, archived) = app
        .post(&uri, admin.token(), json!({ "status": "archived" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["status"], "archived");

    let (status, republished) = app
        .post(&uri, admin.token(), json!({ "status": "published" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(republished["published_at"], first_published);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_returning_to_pending_is_invalid() {
    let app = TestApp::new().await;
    let admin = app.register_with_role("ADMIN").await;
    let (prompt, _) = app.published_prompt(json!({})).await;

    let (status, _) = app
        .post(
            &format!("/api/v1/prompts/{}/status", prompt["slug"].as_str().unwrap()),
            admin.token(),
            json!({ "status": "pending" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_owner_edits_but_staff_flags_need_publish_grant() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let stranger = app.register().await;
    let prompt = app.create_prompt(&owner, json!({})).await;
    let uri = format!("/api/v1/prompts/{}", prompt["slug"].as_str().unwrap());

    let (status, updated) = app
        .patch(&uri, owner.token(), json!({ "title": "Sharper summary" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Sharper summary");
    assert_eq!(updated["slug"], prompt["slug"]);

    let (status, _) = app
        .patch(&uri, owner.token(), json!({ "is_featured": true }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Drafts are invisible to strangers, so edits look like a missing prompt
    let (status, _) = app
        .patch(&uri, stranger.token(), json!({ "title": "Hijacked" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_delete_requires_grant_and_releases_tags() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let admin = app.register_with_role("ADMIN").await;
    let tag = create_tag(&app, &admin).await;
    let tag_slug = tag["slug"].as_str().unwrap();

    let prompt = app
        .create_prompt(
            &owner,
            json!({ "category_codes": ["writing"], "tag_slugs": [tag_slug] }),
        )
        .await;
    let uri = format!("/api/v1/prompts/{}", prompt["slug"].as_str().unwrap());
    assert_eq!(tag_usage(&app, tag_slug).await, 1);

    let (status, _) = app.delete(&uri, owner.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, admin.token()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, admin.token()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Content goes with the prompt; taxonomy rows outlive it
    let prompt_id: Uuid = prompt["id"].as_str().unwrap().parse().unwrap();
    let contents: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM prompt_contents WHERE prompt_id = $1")
            .bind(prompt_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(contents, 0);
    assert_eq!(tag_usage(&app, tag_slug).await, 0);
    let (_, categories) = app.get("/api/v1/categories", None).await;
    assert!(categories
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["code"] == "writing"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_tag_links_are_idempotent() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let admin = app.register_with_role("ADMIN").await;
    let tag = create_tag(&app, &admin).await;
    let tag_slug = tag["slug"].as_str().unwrap();
    let prompt = app.create_prompt(&owner, json!({})).await;
    let uri = format!(
        "/api/v1/prompts/{}/tags/{}",
        prompt["slug"].as_str().unwrap(),
        tag_slug
    );

    for _ in 0..2 {
        let (status, link) = app.send(Method::PUT, &uri, owner.token(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(link["linked"], true);
        assert_eq!(link["usage_count"], 1);
    }

    for _ in 0..2 {
        let (status, link) = app.delete(&uri, owner.token()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(link["linked"], false);
        assert_eq!(link["usage_count"], 0);
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_primary_category_follows_links() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let prompt = app.create_prompt(&owner, json!({})).await;
    let base = format!("/api/v1/prompts/{}/categories", prompt["slug"].as_str().unwrap());

    let (status, linked) = app
        .put(
            &format!("{}/coding", base),
            owner.token(),
            json!({ "is_primary": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(linked["primary_category_id"].is_string());

    let (status, _) = app
        .send(Method::PUT, &format!("{}/marketing", base), owner.token(), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, unlinked) = app
        .delete(&format!("{}/coding", base), owner.token())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(unlinked["primary_category_id"].is_null());

    let (status, _) = app
        .send(Method::PUT, &format!("{}/no-such-category", base), owner.token(), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_views_and_shares_count_every_call() {
    let app = TestApp::new().await;
    let reader = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let slug = prompt["slug"].as_str().unwrap();
    let view_uri = format!("/api/v1/prompts/{}/view", slug);

    let (status, first) = app.send(Method::POST, &view_uri, reader.token(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["view_count"], 1);
    assert_eq!(first["user_view_count"], 1);

    let (_, second) = app.send(Method::POST, &view_uri, None, None).await;
    assert_eq!(second["view_count"], 2);
    assert!(second["user_view_count"].is_null());

    let (status, shared) = app
        .send(
            Method::POST,
            &format!("/api/v1/prompts/{}/share", slug),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared["share_count"], 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_views_are_all_counted() {
    let app = TestApp::new().await;
    let first = app.register().await;
    let second = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let view_uri = format!("/api/v1/prompts/{}/view", prompt["slug"].as_str().unwrap());

    let ((status_a, _), (status_b, _)) = tokio::join!(
        app.send(Method::POST, &view_uri, first.token(), None),
        app.send(Method::POST, &view_uri, second.token(), None),
    );
    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);

    let prompt_id: Uuid = prompt["id"].as_str().unwrap().parse().unwrap();
    let view_count: i64 = sqlx::query_scalar("SELECT view_count FROM prompts WHERE id = $1")
        .bind(prompt_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(view_count, 2);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_prompt_interactions WHERE prompt_id = $1 AND view_count = 1",
    )
    .bind(prompt_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_listing_shows_published_and_own_drafts() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let marker = short_id();
    let draft = app
        .create_prompt(&owner, json!({ "title": format!("Draft {}", marker) }))
        .await;

    let (status, public) = app
        .get(&format!("/api/v1/prompts?q={}", marker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["total"], 0);

    let (status, own) = app
        .get(
            &format!("/api/v1/prompts?q={}&created_by={}", marker, owner.id),
            owner.token(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["total"], 1);
    assert_eq!(own["items"][0]["slug"], draft["slug"]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_page_size_is_capped() {
    let app = TestApp::new().await;
    let (status, page) = app.get("/api/v1/prompts?per_page=1000", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["per_page"], 100);
}
