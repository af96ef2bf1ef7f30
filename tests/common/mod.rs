#![allow(dead_code)]

use std::collections::HashMap;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use inkwell::{
    AppState, app,
    auth::Clients,
    config::Config,
    db::{
        Group, Post, User, groups as db_groups, posts as db_posts,
        users::{self, NewUser},
    },
    session::USER_ID,
};
use sqlx::SqlitePool;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use tower_sessions::{
    MemoryStore, SessionStore,
    session::{Id, Record},
};

/// A 2x1 GIF.
pub const SMALL_GIF: &[u8] = b"\x47\x49\x46\x38\x39\x61\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\
\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\
\x0A\x00\x3B";

const BOUNDARY: &str = "inkwell-test-boundary";

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    router: Router,
    pub media_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(mut config: Config) -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        config.media_root = media_dir.path().to_owned();

        let db_pool = inkwell::db::connect_in_memory().await.unwrap();
        let state = AppState::new(db_pool, Clients::default(), config);
        let store = MemoryStore::default();
        let router = app(state.clone(), store.clone());

        TestApp {
            state,
            store,
            router,
            media_dir,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.state.db_pool
    }

    pub async fn user(&self, username: &str) -> User {
        users::create_user(self.db(), NewUser::named(username))
            .await
            .unwrap()
    }

    pub async fn group(&self, title: &str, slug: &str) -> Group {
        db_groups::create_group(
            self.db(),
            db_groups::NewGroup {
                title: title.to_owned(),
                slug: slug.to_owned(),
                description: format!("All about {title}"),
            },
        )
        .await
        .unwrap()
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        db_posts::insert_post(
            self.db(),
            db_posts::NewPost {
                text: text.to_owned(),
                author_id: author.id,
                group_id: group.map(|group| group.id),
                image: None,
            },
        )
        .await
        .unwrap()
    }

    /// Stores a logged-in session for `user` and returns the cookie naming it.
    pub async fn login(&self, user: &User) -> String {
        let record = Record {
            id: Id::default(),
            data: HashMap::from([(USER_ID.to_owned(), serde_json::json!(user.id))]),
            expiry_date: OffsetDateTime::now_utc() + Duration::days(1),
        };
        self.store.save(&record).await.unwrap();
        format!("id={}", record.id)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(with_cookie(Request::get(uri), cookie).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, form: &str) -> Response<Body> {
        self.send(
            with_cookie(Request::post(uri), cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_owned()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: Option<&str>,
        parts: &[Part<'_>],
    ) -> Response<Body> {
        self.send(
            with_cookie(Request::post(uri), cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = with_cookie(Request::builder().method(method).uri(uri), cookie);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn with_cookie(builder: axum::http::request::Builder, cookie: Option<&str>) -> axum::http::request::Builder {
    match cookie {
        Some(cookie) => builder.header(header::COOKIE, cookie),
        None => builder,
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Post cards in a rendered feed.
pub fn card_count(html: &str) -> usize {
    html.matches(r#"<article class="post" "#).count()
}
