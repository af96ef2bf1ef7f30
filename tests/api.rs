mod common;

use axum::http::StatusCode;
use common::TestApp;
use inkwell::db::{comments, follows, posts};
use serde_json::json;

#[tokio::test]
async fn posts_list_paginates_only_with_limit() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    for n in 0..3 {
        app.post(&leo, &format!("post {n}"), None).await;
    }

    let (status, body) = app.json("GET", "/api/v1/posts/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[0]["text"], "post 2");
    assert_eq!(body[0]["author"], "leo");
    assert_eq!(body[0]["group"], serde_json::Value::Null);

    let (status, body) = app.json("GET", "/api/v1/posts/?limit=2&offset=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["results"][0]["text"], "post 1");
    assert_eq!(body["next"], serde_json::Value::Null);
    assert_eq!(body["previous"], "http://localhost:8080/api/v1/posts/?limit=2");
}

#[tokio::test]
async fn writes_need_login() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let post = app.post(&leo, "hello", None).await;

    let (status, body) = app
        .json("POST", "/api/v1/posts/", None, Some(json!({ "text": "anon" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Authentication credentials were not provided.");

    let uri = format!("/api/v1/posts/{}/comments/", post.id);
    let (status, _) = app.json("POST", &uri, None, Some(json!({ "text": "anon" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(comments::count_comments(app.db()).await.unwrap(), 0);

    let (status, _) = app.json("GET", "/api/v1/follow/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_post_stamps_caller_as_author() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    app.user("ann").await;
    let group = app.group("Rust", "rust").await;
    let cookie = app.login(&leo).await;

    let (status, body) = app
        .json(
            "POST",
            "/api/v1/posts/",
            Some(&cookie),
            Some(json!({ "text": "via api", "author": "ann", "group": group.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"], "leo");
    assert_eq!(body["group"], group.id);
    assert_eq!(body["image"], serde_json::Value::Null);

    let id = body["id"].as_i64().unwrap();
    let stored = posts::find_post_by_id(app.db(), id).await.unwrap().unwrap();
    assert_eq!(stored.author_id, leo.id);
}

#[tokio::test]
async fn invalid_post_bodies_are_field_errors() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let cookie = app.login(&leo).await;

    let (status, body) = app
        .json("POST", "/api/v1/posts/", Some(&cookie), Some(json!({ "group": 404 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["text"][0], "This field is required.");
    assert!(body["group"][0].is_string());

    let (status, body) = app
        .json("POST", "/api/v1/posts/", Some(&cookie), Some(json!({ "text": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"][0].is_string());

    assert_eq!(posts::count_posts(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn only_author_changes_post() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let mallory = app.user("mallory").await;
    let group = app.group("Rust", "rust").await;
    let post = app.post(&leo, "original", Some(&group)).await;
    let uri = format!("/api/v1/posts/{}/", post.id);

    let intruder = app.login(&mallory).await;
    let (status, body) = app
        .json("PATCH", &uri, Some(&intruder), Some(json!({ "text": "defaced" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "You do not have permission to perform this action.");
    let (status, _) = app.json("DELETE", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = app.login(&leo).await;
    let (status, body) = app
        .json("PATCH", &uri, Some(&owner), Some(json!({ "text": "edited" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "edited");
    assert_eq!(body["group"], group.id);

    let (status, body) = app
        .json("PUT", &uri, Some(&owner), Some(json!({ "text": "replaced" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["group"], serde_json::Value::Null);

    comments::insert_comment(app.db(), post.id, mallory.id, "bye").await.unwrap();
    let (status, _) = app.json("DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(posts::count_posts(app.db()).await.unwrap(), 0);
    assert_eq!(comments::count_comments(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_objects_are_404() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let cookie = app.login(&leo).await;

    for uri in [
        "/api/v1/posts/999/",
        "/api/v1/posts/abc/",
        "/api/v1/groups/999/",
        "/api/v1/posts/999/comments/",
        "/api/v1/posts/999/comments/1/",
    ] {
        let (status, body) = app.json("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["detail"], "Not found.");
    }

    let (status, _) = app
        .json("POST", "/api/v1/posts/999/comments/", Some(&cookie), Some(json!({ "text": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn groups_are_read_only() {
    let app = TestApp::new().await;
    let group = app.group("Rust", "rust").await;

    let (status, body) = app.json("GET", "/api/v1/groups/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["slug"], "rust");

    let uri = format!("/api/v1/groups/{}/", group.id);
    let (_, body) = app.json("GET", &uri, None, None).await;
    assert_eq!(body["title"], "Rust");

    let (status, _) = app
        .json("POST", "/api/v1/groups/", None, Some(json!({ "title": "x", "slug": "x" })))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn comments_are_bound_to_route_post() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let ann = app.user("ann").await;
    let first = app.post(&leo, "first", None).await;
    let second = app.post(&leo, "second", None).await;
    let cookie = app.login(&ann).await;

    let uri = format!("/api/v1/posts/{}/comments/", first.id);
    let (status, body) = app
        .json("POST", &uri, Some(&cookie), Some(json!({ "text": "hi", "post": second.id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["post"], first.id);
    assert_eq!(body["author"], "ann");
    let comment_id = body["id"].as_i64().unwrap();

    let (_, body) = app.json("GET", &uri, None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let other_post = format!("/api/v1/posts/{}/comments/{comment_id}/", second.id);
    let (status, _) = app.json("GET", &other_post, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let detail = format!("{uri}{comment_id}/");
    let leo_cookie = app.login(&leo).await;
    let (status, _) = app
        .json("PATCH", &detail, Some(&leo_cookie), Some(json!({ "text": "mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json("PATCH", &detail, Some(&cookie), Some(json!({ "text": "edited" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "edited");

    let (status, body) = app.json("PUT", &detail, Some(&cookie), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["text"][0], "This field is required.");

    let (status, _) = app.json("DELETE", &detail, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(comments::count_comments(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn follow_rejects_self_and_duplicates() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    app.user("ann").await;
    app.user("annabel").await;
    app.user("bob").await;
    let cookie = app.login(&leo).await;

    let (status, body) = app
        .json("POST", "/api/v1/follow/", Some(&cookie), Some(json!({ "following": "leo" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["following"][0].is_string());
    assert_eq!(follows::count_follows(app.db()).await.unwrap(), 0);

    let (status, body) = app
        .json("POST", "/api/v1/follow/", Some(&cookie), Some(json!({ "following": "ann" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"], "leo");
    assert_eq!(body["following"], "ann");

    let (status, body) = app
        .json("POST", "/api/v1/follow/", Some(&cookie), Some(json!({ "following": "ann" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"][0].is_string());
    assert_eq!(follows::count_follows(app.db()).await.unwrap(), 1);

    let (status, body) = app
        .json("POST", "/api/v1/follow/", Some(&cookie), Some(json!({ "following": "ghost" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["following"][0], "Object with username=ghost does not exist.");

    for following in ["annabel", "bob"] {
        app.json("POST", "/api/v1/follow/", Some(&cookie), Some(json!({ "following": following })))
            .await;
    }
    let (_, body) = app.json("GET", "/api/v1/follow/", Some(&cookie), None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = app.json("GET", "/api/v1/follow/?search=ANN", Some(&cookie), None).await;
    let found: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|edge| edge["following"].as_str().unwrap())
        .collect();
    assert_eq!(found, vec!["ann", "annabel"]);

    let (status, _) = app.json("DELETE", "/api/v1/follow/", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
