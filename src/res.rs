//! Embedded page templates and the helpers that render them.
//!
//! Templates are Tera files under `res/pages`, compiled into the binary.
//! Every `{{ value }}` is HTML-escaped; only Markdown output and feed
//! fragments this module rendered itself go through `| safe`.

use std::sync::LazyLock;

use axum::{
    debug_handler,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use oauth2::url::form_urlencoded;
use serde::Serialize;
use tera::{Context, Tera};
use time::{OffsetDateTime, macros::format_description};

use crate::{
    db::{CommentView, PostView, User},
    feed::Page,
    media,
};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

static TEMPLATES: LazyLock<Tera> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_res!(str, "/pages/base.html")),
        ("feed.html", include_res!(str, "/pages/feed.html")),
        ("index.html", include_res!(str, "/pages/index.html")),
        ("follow.html", include_res!(str, "/pages/follow.html")),
        ("group_list.html", include_res!(str, "/pages/group_list.html")),
        ("profile.html", include_res!(str, "/pages/profile.html")),
        ("post_detail.html", include_res!(str, "/pages/post_detail.html")),
        ("create_post.html", include_res!(str, "/pages/create_post.html")),
        ("login.html", include_res!(str, "/pages/login.html")),
        ("about.html", include_res!(str, "/pages/about.html")),
        ("404.html", include_res!(str, "/pages/404.html")),
        ("500.html", include_res!(str, "/pages/500.html")),
    ])
    .expect("embedded templates are valid Tera");
    tera
});

/// Renders Markdown to HTML. Raw HTML in the source is shown as text.
pub fn markdown(source: &str) -> String {
    use pulldown_cmark::{Event, Options, Parser};

    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES)
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            _ => event,
        });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

pub fn format_date(date: OffsetDateTime) -> String {
    date.format(format_description!("[day].[month].[year] [hour]:[minute]"))
        .unwrap_or_default()
}

/// Context every full page starts from: the `<title>` and who is browsing.
pub fn page_context(title: &str, viewer: Option<&User>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("title", title);
    ctx.insert("viewer", &viewer.map(|user| user.username.as_str()));
    ctx
}

pub fn render(template: &str, ctx: &Context) -> tera::Result<Html<String>> {
    TEMPLATES.render(template, ctx).map(Html)
}

#[derive(Debug, Serialize)]
pub struct GroupLink<'a> {
    pub slug: &'a str,
    pub title: &'a str,
}

/// A post as the feed and detail templates show it.
#[derive(Debug, Serialize)]
pub struct PostCard<'a> {
    pub id: i64,
    pub author: &'a str,
    pub created: String,
    pub group: Option<GroupLink<'a>>,
    pub image_url: Option<String>,
    pub html: String,
}

impl<'a> From<&'a PostView> for PostCard<'a> {
    fn from(view: &'a PostView) -> Self {
        let group = match (&view.group_slug, &view.group_title) {
            (Some(slug), Some(title)) => Some(GroupLink { slug, title }),
            _ => None,
        };

        PostCard {
            id: view.post.id,
            author: &view.author_username,
            created: format_date(view.post.created),
            group,
            image_url: view.post.image.as_deref().map(media::media_url),
            html: markdown(&view.post.text),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentCard<'a> {
    pub author: &'a str,
    pub created: String,
    pub html: String,
}

impl<'a> From<&'a CommentView> for CommentCard<'a> {
    fn from(view: &'a CommentView) -> Self {
        CommentCard {
            author: &view.author_username,
            created: format_date(view.comment.created),
            html: markdown(&view.comment.text),
        }
    }
}

/// Page links under a feed. Links are relative (`?page=N`) so they keep
/// whatever path the feed is served from.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Paginator {
    pub number: u32,
    pub num_pages: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl Paginator {
    /// `None` when there is nothing to page through.
    pub fn for_page<T>(page: &Page<T>) -> Option<Paginator> {
        if page.num_pages() <= 1 && page.number <= 1 {
            return None;
        }

        Some(Paginator {
            number: page.number,
            num_pages: page.num_pages(),
            previous: page.has_previous().then(|| page.number - 1),
            next: page.has_next().then(|| page.number + 1),
        })
    }
}

/// Post cards followed by page links, as an HTML fragment pages embed.
pub fn feed(page: &Page<PostView>) -> tera::Result<String> {
    let posts: Vec<PostCard> = page.items.iter().map(PostCard::from).collect();

    let mut ctx = Context::new();
    ctx.insert("posts", &posts);
    ctx.insert("paginator", &Paginator::for_page(page));
    TEMPLATES.render("feed.html", &ctx)
}

/// Where a guest goes when a page needs a login, coming back to `return_url`.
pub fn login_redirect(return_url: &str) -> Response {
    let return_url: String = form_urlencoded::byte_serialize(return_url.as_bytes()).collect();
    Redirect::to(&format!("/login?return_url={return_url}")).into_response()
}

fn error_page(status: StatusCode, template: &str, title: &str) -> Response {
    match render(template, &page_context(title, None)) {
        Ok(html) => (status, html).into_response(),
        Err(err) => {
            tracing::error!(template, %err, "could not render error page");
            (status, title.to_owned()).into_response()
        }
    }
}

pub fn not_found() -> Response {
    error_page(StatusCode::NOT_FOUND, "404.html", "Page not found")
}

pub fn server_error() -> Response {
    error_page(StatusCode::INTERNAL_SERVER_ERROR, "500.html", "Server error")
}

#[debug_handler]
pub async fn fallback(uri: Uri) -> Response {
    tracing::debug!(%uri, "no route");
    not_found()
}
