//! Read side: paginated post feeds and the single-post detail view.
//!
//! All four feeds run the same joined query; a [`FeedScope`] only decides the
//! `WHERE` clause. Pages are fixed-size windows, newest first. Ids grow in
//! insertion order, so "newest" is the highest id; the `created` text does
//! not sort chronologically within a second. A page past the end is empty
//! rather than an error.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    db::{
        CommentView, Group, PostView, User, comments, follows, groups, posts,
        posts::POST_VIEW_SELECT, users,
    },
    error::{BlogError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    All,
    Group(i64),
    Author(i64),
    /// Posts by authors the given user follows.
    FollowedBy(i64),
}

impl FeedScope {
    fn push_filter(self, query: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            FeedScope::All => {}
            FeedScope::Group(group_id) => {
                query.push(" WHERE p.group_id = ").push_bind(group_id);
            }
            FeedScope::Author(author_id) => {
                query.push(" WHERE p.author_id = ").push_bind(author_id);
            }
            FeedScope::FollowedBy(user_id) => {
                query
                    .push(" WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ")
                    .push_bind(user_id)
                    .push(")");
            }
        }
    }
}

/// `?page=` as it arrives from the query string. Anything unparsable means
/// the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        PageRequest {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn from_query(query: &PageQuery, size: u32) -> Self {
        let number = query
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(1);
        PageRequest::new(number, size)
    }

    fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub size: u32,
    /// Items across all pages.
    pub total: i64,
}

impl<T> Page<T> {
    pub fn num_pages(&self) -> u32 {
        let size = i64::from(self.size.max(1));
        u32::try_from((self.total + size - 1) / size)
            .unwrap_or(u32::MAX)
            .max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Counts the posts in `scope` and loads one window of them, newest first.
/// A negative `limit` means no limit.
async fn fetch_window(
    db_pool: &SqlitePool,
    scope: FeedScope,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PostView>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts p");
    scope.push_filter(&mut count);
    let (total,): (i64,) = count.build_query_as().fetch_one(db_pool).await?;

    let mut query = QueryBuilder::<Sqlite>::new(POST_VIEW_SELECT);
    scope.push_filter(&mut query);
    query
        .push(" ORDER BY p.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = query.build_query_as::<PostView>().fetch_all(db_pool).await?;

    Ok((items, total))
}

pub async fn fetch_feed(
    db_pool: &SqlitePool,
    scope: FeedScope,
    page: PageRequest,
) -> Result<Page<PostView>> {
    let (items, total) = fetch_window(db_pool, scope, i64::from(page.size), page.offset()).await?;

    tracing::debug!(?scope, page = page.number, total, found = items.len(), "feed page");
    Ok(Page {
        items,
        number: page.number,
        size: page.size,
        total,
    })
}

/// Limit/offset slicing for API clients. Without a limit every post is
/// returned.
pub async fn list_posts(
    db_pool: &SqlitePool,
    limit: Option<u32>,
    offset: u32,
) -> Result<(Vec<PostView>, i64)> {
    let limit = limit.map_or(-1, i64::from);
    fetch_window(db_pool, FeedScope::All, limit, i64::from(offset)).await
}

pub async fn global_feed(db_pool: &SqlitePool, page: PageRequest) -> Result<Page<PostView>> {
    fetch_feed(db_pool, FeedScope::All, page).await
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostView>,
}

pub async fn group_feed(db_pool: &SqlitePool, slug: &str, page: PageRequest) -> Result<GroupFeed> {
    let group = groups::find_group_by_slug(db_pool, slug)
        .await?
        .ok_or(BlogError::NotFound("group"))?;
    let page = fetch_feed(db_pool, FeedScope::Group(group.id), page).await?;
    Ok(GroupFeed { group, page })
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: User,
    pub page: Page<PostView>,
    /// Whether the viewer follows `author`. Always false for guests and on
    /// one's own profile.
    pub following: bool,
}

pub async fn profile_feed(
    db_pool: &SqlitePool,
    username: &str,
    viewer: Option<&User>,
    page: PageRequest,
) -> Result<ProfileFeed> {
    let author = users::find_user_by_username(db_pool, username)
        .await?
        .ok_or(BlogError::NotFound("user"))?;
    let page = fetch_feed(db_pool, FeedScope::Author(author.id), page).await?;

    let following = match viewer {
        Some(viewer) if viewer.id != author.id => {
            follows::is_following(db_pool, viewer.id, author.id).await?
        }
        _ => false,
    };

    Ok(ProfileFeed {
        author,
        page,
        following,
    })
}

pub async fn following_feed(
    db_pool: &SqlitePool,
    viewer: &User,
    page: PageRequest,
) -> Result<Page<PostView>> {
    fetch_feed(db_pool, FeedScope::FollowedBy(viewer.id), page).await
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub author_post_count: i64,
}

pub async fn post_detail(db_pool: &SqlitePool, post_id: i64) -> Result<PostDetail> {
    let post = posts::find_post_view_by_id(db_pool, post_id)
        .await?
        .ok_or(BlogError::NotFound("post"))?;
    let comments = comments::find_comments_by_post(db_pool, post_id).await?;
    let author_post_count = posts::count_posts_by_author(db_pool, post.post.author_id).await?;

    Ok(PostDetail {
        post,
        comments,
        author_post_count,
    })
}
