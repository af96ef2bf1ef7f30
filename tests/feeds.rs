mod common;

use std::time::Duration;

use common::{TestApp, body_string, card_count};
use inkwell::{
    config::Config,
    db::{comments, follows, groups, posts},
    error::{BlogError, Constraint},
    feed::{self, PageRequest},
};
use time::macros::datetime;

#[tokio::test]
async fn feeds_split_into_pages() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let group = app.group("Rust", "rust").await;
    let size = app.state.config.page_size;
    for n in 0..size + 3 {
        app.post(&leo, &format!("post number {n}"), Some(&group)).await;
    }

    for feed_uri in ["/", "/group/rust/", "/profile/leo/"] {
        let first = body_string(app.get(&format!("{feed_uri}?page=1"), None).await).await;
        assert_eq!(card_count(&first), size as usize, "{feed_uri}");

        let second = body_string(app.get(&format!("{feed_uri}?page=2"), None).await).await;
        assert_eq!(card_count(&second), 3, "{feed_uri}");

        let beyond = body_string(app.get(&format!("{feed_uri}?page=9"), None).await).await;
        assert_eq!(card_count(&beyond), 0, "{feed_uri}");
    }
}

#[tokio::test]
async fn feeds_are_newest_first() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let older = app.post(&leo, "older", None).await;
    let newer = app.post(&leo, "newer", None).await;

    let page = feed::global_feed(app.db(), PageRequest::new(1, 10)).await.unwrap();
    let ids: Vec<i64> = page.items.iter().map(|view| view.post.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert_eq!(page.items[0].author_username, "leo");
}

#[tokio::test]
async fn sub_second_timestamps_keep_insertion_order() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;

    // Stored as "...00.1Z" and "...00.12Z"; as text the older one sorts last.
    for (text, created) in [
        ("older", datetime!(2025-01-01 12:00:00.1 UTC)),
        ("newer", datetime!(2025-01-01 12:00:00.12 UTC)),
    ] {
        sqlx::query("INSERT INTO posts (text, created, author_id) VALUES (?, ?, ?)")
            .bind(text)
            .bind(created)
            .bind(leo.id)
            .execute(app.db())
            .await
            .unwrap();
    }

    let page = feed::global_feed(app.db(), PageRequest::new(1, 10)).await.unwrap();
    let texts: Vec<&str> = page.items.iter().map(|view| view.post.text.as_str()).collect();
    assert_eq!(texts, ["newer", "older"]);

    let post_id = page.items[0].post.id;
    for (text, created) in [
        ("first", datetime!(2025-01-01 12:00:01.1 UTC)),
        ("second", datetime!(2025-01-01 12:00:01.12 UTC)),
    ] {
        sqlx::query("INSERT INTO comments (text, created, post_id, author_id) VALUES (?, ?, ?, ?)")
            .bind(text)
            .bind(created)
            .bind(post_id)
            .bind(leo.id)
            .execute(app.db())
            .await
            .unwrap();
    }

    let detail = feed::post_detail(app.db(), post_id).await.unwrap();
    let texts: Vec<&str> = detail.comments.iter().map(|view| view.comment.text.as_str()).collect();
    assert_eq!(texts, ["second", "first"]);
}

#[tokio::test]
async fn cached_home_feed_is_stale_until_cleared() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let post = app.post(&leo, "soon to be gone", None).await;

    let first = body_string(app.get("/", None).await).await;
    assert!(first.contains("soon to be gone"));

    posts::delete_post(app.db(), post.id).await.unwrap();
    let cached = body_string(app.get("/", None).await).await;
    assert_eq!(cached, first);

    app.state.feed_cache.clear().await;
    let fresh = body_string(app.get("/", None).await).await;
    assert!(!fresh.contains("soon to be gone"));
}

#[tokio::test]
async fn stray_query_parameters_share_cached_page() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let post = app.post(&leo, "cached once", None).await;

    let first = body_string(app.get("/?utm_source=mail", None).await).await;
    assert!(first.contains("cached once"));

    posts::delete_post(app.db(), post.id).await.unwrap();
    for uri in ["/", "/?utm_source=feed", "/?page=1&x=y", "/?page=abc"] {
        let html = body_string(app.get(uri, None).await).await;
        assert!(html.contains("cached once"), "{uri}");
    }

    let second = body_string(app.get("/?page=2", None).await).await;
    assert!(!second.contains("cached once"));
}

#[tokio::test]
async fn cached_home_feed_expires() {
    let app = TestApp::with_config(Config {
        feed_cache_ttl: Duration::from_millis(200),
        ..Config::default()
    })
    .await;
    let leo = app.user("leo").await;

    let empty = body_string(app.get("/", None).await).await;
    assert_eq!(card_count(&empty), 0);

    app.post(&leo, "fresh post", None).await;
    let cached = body_string(app.get("/", None).await).await;
    assert_eq!(card_count(&cached), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let expired = body_string(app.get("/", None).await).await;
    assert!(expired.contains("fresh post"));
}

#[tokio::test]
async fn deleting_post_removes_comments() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let post = app.post(&leo, "with comments", None).await;
    comments::insert_comment(app.db(), post.id, leo.id, "one").await.unwrap();
    comments::insert_comment(app.db(), post.id, leo.id, "two").await.unwrap();
    assert_eq!(comments::count_comments(app.db()).await.unwrap(), 2);

    assert!(posts::delete_post(app.db(), post.id).await.unwrap());
    assert_eq!(comments::count_comments(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_group_keeps_posts() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let group = app.group("Cats", "cats").await;
    let post = app.post(&leo, "in a group", Some(&group)).await;

    assert!(groups::delete_group(app.db(), group.id).await.unwrap());

    let stored = posts::find_post_by_id(app.db(), post.id).await.unwrap().unwrap();
    assert_eq!(stored.group_id, None);
    assert_eq!(posts::count_posts(app.db()).await.unwrap(), 1);
}

#[tokio::test]
async fn follow_edges_are_unique_and_never_self() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let ann = app.user("ann").await;

    let (_, created) = follows::get_or_create_follow(app.db(), leo.id, ann.id).await.unwrap();
    assert!(created);
    let (_, created) = follows::get_or_create_follow(app.db(), leo.id, ann.id).await.unwrap();
    assert!(!created);
    assert_eq!(follows::count_follows(app.db()).await.unwrap(), 1);

    let duplicate = follows::insert_follow(app.db(), leo.id, ann.id).await;
    assert!(matches!(duplicate, Err(BlogError::Constraint(Constraint::Unique, _))));

    let own = follows::insert_follow(app.db(), leo.id, leo.id).await;
    assert!(matches!(own, Err(BlogError::Constraint(Constraint::Check, _))));
    assert_eq!(follows::count_follows(app.db()).await.unwrap(), 1);
}

#[tokio::test]
async fn profile_reports_follow_state() {
    let app = TestApp::new().await;
    let leo = app.user("leo").await;
    let ann = app.user("ann").await;
    follows::get_or_create_follow(app.db(), leo.id, ann.id).await.unwrap();

    let page = PageRequest::new(1, 10);
    let profile = feed::profile_feed(app.db(), "ann", Some(&leo), page).await.unwrap();
    assert!(profile.following);
    let profile = feed::profile_feed(app.db(), "ann", None, page).await.unwrap();
    assert!(!profile.following);
    let profile = feed::profile_feed(app.db(), "leo", Some(&leo), page).await.unwrap();
    assert!(!profile.following);

    let missing = feed::profile_feed(app.db(), "nobody", None, page).await;
    assert!(matches!(missing, Err(BlogError::NotFound("user"))));
}
