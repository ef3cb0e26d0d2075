//! Integration tests for likes, saves, ratings, comments and reviews.
//!
//! Run with: TEST_DATABASE_URL=postgres://... cargo test --test engagement_integration -- --ignored

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_like_is_an_idempotent_toggle() {
    let app = TestApp::new().await;
    let reader = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let uri = format!("/api/v1/prompts/{}/like", prompt["slug"].as_str().unwrap());

    let (status, liked) = app.put(&uri, reader.token(), json!({ "liked": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked, json!({ "changed": true, "value": true, "count": 1 }));

    let (_, again) = app.put(&uri, reader.token(), json!({ "liked": true })).await;
    assert_eq!(again, json!({ "changed": false, "value": true, "count": 1 }));

    let (_, unliked) = app.put(&uri, reader.token(), json!({ "liked": false })).await;
    assert_eq!(unliked, json!({ "changed": true, "value": false, "count": 0 }));

    let (_, unliked_again) = app.put(&uri, reader.token(), json!({ "liked": false })).await;
    assert_eq!(unliked_again["count"], 0);

    let (_, relike) = app.put(&uri, reader.token(), json!({ "liked": true })).await;
    assert_eq!(relike["count"], 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_guests_cannot_like() {
    let app = TestApp::new().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let (status, _) = app
        .put(
            &format!("/api/v1/prompts/{}/like", prompt["slug"].as_str().unwrap()),
            None,
            json!({ "liked": true }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_saved_prompts_listing() {
    let app = TestApp::new().await;
    let reader = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let slug = prompt["slug"].as_str().unwrap();

    let (status, saved) = app
        .put(
            &format!("/api/v1/prompts/{}/save", slug),
            reader.token(),
            json!({ "saved": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["count"], 1);

    let (status, page) = app.get("/api/v1/users/me/saved", reader.token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["slug"], slug);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_rating_average_tracks_revisions() {
    let app = TestApp::new().await;
    let first = app.register().await;
    let second = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let uri = format!("/api/v1/prompts/{}/rating", prompt["slug"].as_str().unwrap());

    let (status, rated) = app.put(&uri, first.token(), json!({ "stars": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(rated["previous"].is_null());

    let (_, rated) = app.put(&uri, second.token(), json!({ "stars": 2 })).await;
    assert_eq!(rated["rating_count"], 2);
    assert_eq!(rated["average_rating"], 3.5);

    let (_, revised) = app.put(&uri, first.token(), json!({ "stars": 4 })).await;
    assert_eq!(revised["previous"], 5);
    assert_eq!(revised["rating_count"], 2);
    assert_eq!(revised["average_rating"], 3.0);

    let (status, _) = app.put(&uri, first.token(), json!({ "stars": 6 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_comment_thread_pages_with_cursor() {
    let app = TestApp::new().await;
    let reader = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let uri = format!("/api/v1/prompts/{}/comments", prompt["slug"].as_str().unwrap());

    for n in 0..3 {
        let (status, comment) = app
            .post(&uri, reader.token(), json!({ "text": format!("Comment {}", n) }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["username"], reader.username);
    }

    let (status, first_page) = app.get(&format!("{}?limit=2", uri), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_page["items"].as_array().unwrap().len(), 2);
    assert_eq!(first_page["items"][0]["text"], "Comment 0");
    let cursor = first_page["next_cursor"].as_str().unwrap();

    let (_, second_page) = app
        .get(&format!("{}?limit=2&cursor={}", uri, cursor), None)
        .await;
    assert_eq!(second_page["items"].as_array().unwrap().len(), 1);
    assert_eq!(second_page["items"][0]["text"], "Comment 2");
    assert!(second_page["next_cursor"].is_null());

    let (_, detail) = app
        .get(
            &format!("/api/v1/prompts/{}", prompt["slug"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(detail["prompt"]["comment_count"], 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_malformed_cursor_is_rejected() {
    let app = TestApp::new().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let (status, _) = app
        .get(
            &format!(
                "/api/v1/prompts/{}/comments?cursor=not-a-cursor",
                prompt["slug"].as_str().unwrap()
            ),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_comment_moderation() {
    let app = TestApp::new().await;
    let author = app.register().await;
    let bystander = app.register().await;
    let moderator = app.register_with_role("MODERATOR").await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let slug = prompt["slug"].as_str().unwrap();
    let uri = format!("/api/v1/prompts/{}/comments", slug);

    let (_, comment) = app
        .post(&uri, author.token(), json!({ "text": "Needs a moderator" }))
        .await;
    let status_uri = format!("/api/v1/comments/{}/status", comment["id"].as_str().unwrap());

    let (status, _) = app
        .patch(&status_uri, bystander.token(), json!({ "status": "hidden" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, hidden) = app
        .patch(&status_uri, moderator.token(), json!({ "status": "hidden" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hidden["status"], "hidden");

    let (_, public) = app.get(&uri, None).await;
    assert!(public["items"].as_array().unwrap().is_empty());
    let (_, moderated) = app.get(&uri, moderator.token()).await;
    assert_eq!(moderated["items"].as_array().unwrap().len(), 1);

    let (_, detail) = app.get(&format!("/api/v1/prompts/{}", slug), None).await;
    assert_eq!(detail["prompt"]["comment_count"], 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_author_deletes_own_comment() {
    let app = TestApp::new().await;
    let author = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let uri = format!("/api/v1/prompts/{}/comments", prompt["slug"].as_str().unwrap());

    let (_, comment) = app
        .post(&uri, author.token(), json!({ "text": "Typo in here" }))
        .await;
    let status_uri = format!("/api/v1/comments/{}/status", comment["id"].as_str().unwrap());

    // Authors may delete but not restore
    let (status, _) = app
        .patch(&status_uri, author.token(), json!({ "status": "deleted" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .patch(&status_uri, author.token(), json!({ "status": "visible" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_reply_parent_must_belong_to_same_prompt() {
    let app = TestApp::new().await;
    let author = app.register().await;
    let (first, _) = app.published_prompt(json!({})).await;
    let (second, _) = app.published_prompt(json!({})).await;
    let first_uri = format!("/api/v1/prompts/{}/comments", first["slug"].as_str().unwrap());
    let second_uri = format!("/api/v1/prompts/{}/comments", second["slug"].as_str().unwrap());

    let (_, parent) = app
        .post(&first_uri, author.token(), json!({ "text": "Top level" }))
        .await;

    let (status, _) = app
        .post(
            &second_uri,
            author.token(),
            json!({ "text": "Wrong thread", "parent_id": parent["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reply) = app
        .post(
            &first_uri,
            author.token(),
            json!({ "text": "Right thread", "parent_id": parent["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["parent_id"], parent["id"]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_empty_comment_is_rejected() {
    let app = TestApp::new().await;
    let author = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let (status, body) = app
        .post(
            &format!("/api/v1/prompts/{}/comments", prompt["slug"].as_str().unwrap()),
            author.token(),
            json!({ "text": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "text");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_review_is_one_per_user_and_feeds_rating() {
    let app = TestApp::new().await;
    let reviewer = app.register().await;
    let (prompt, _) = app.published_prompt(json!({})).await;
    let slug = prompt["slug"].as_str().unwrap();
    let uri = format!("/api/v1/prompts/{}/review", slug);

    let (status, outcome) = app
        .put(&uri, reviewer.token(), json!({ "rating": 4, "comment": "Solid" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["review"]["rating"], 4);
    assert_eq!(outcome["rating"]["rating_count"], 1);

    let (_, outcome) = app
        .put(&uri, reviewer.token(), json!({ "rating": 2, "comment": "Changed my mind" }))
        .await;
    assert_eq!(outcome["rating"]["previous"], 4);
    assert_eq!(outcome["rating"]["average_rating"], 2.0);

    let (status, reviews) = app
        .get(&format!("/api/v1/prompts/{}/reviews", slug), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let reviews = reviews.as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["comment"], "Changed my mind");

    // A plain rating afterwards moves the review's stars too
    let (status, rated) = app
        .put(
            &format!("/api/v1/prompts/{}/rating", slug),
            reviewer.token(),
            json!({ "stars": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rated["previous"], 2);
    let (_, reviews) = app
        .get(&format!("/api/v1/prompts/{}/reviews", slug), None)
        .await;
    assert_eq!(reviews[0]["rating"], 5);
    assert_eq!(reviews[0]["comment"], "Changed my mind");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_engagement_on_hidden_prompt_is_not_found() {
    let app = TestApp::new().await;
    let owner = app.register().await;
    let reader = app.register().await;
    let draft = app.create_prompt(&owner, json!({})).await;

    let (status, _) = app
        .put(
            &format!("/api/v1/prompts/{}/like", draft["slug"].as_str().unwrap()),
            reader.token(),
            json!({ "liked": true }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
