//! Write side: validated creates and updates for posts, comments and follow
//! edges. Every operation is a single statement against the store, so none
//! is ever partially applied.

use sqlx::SqlitePool;

use crate::{
    db::{
        Comment, CommentView, FollowView, Post, User, comments, follows, groups,
        posts::{self, NewPost, PostChanges},
        users,
    },
    error::{BlogError, Constraint, FieldErrors, Result},
    guard::{self, Access},
    media::{ImageKind, MediaStore, Upload},
};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_GROUP: &str = "Select a valid group. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const SELF_FOLLOW: &str = "You cannot follow yourself.";
pub const DUPLICATE_FOLLOW: &str = "The fields user, following must make a unique set.";

/// A submitted post, as both surfaces hand it over.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group: Option<i64>,
    /// A new image. `None` keeps the current one when editing.
    pub image: Option<Upload>,
    /// Drop the current image (ignored when a new one is uploaded).
    pub clear_image: bool,
}

struct ValidPost {
    text: String,
    group_id: Option<i64>,
    image: Option<(Vec<u8>, ImageKind)>,
}

async fn validate_post(db_pool: &SqlitePool, input: PostInput) -> Result<ValidPost> {
    let mut errors = FieldErrors::new();

    let text = input.text.trim().to_owned();
    if text.is_empty() {
        errors.add("text", REQUIRED);
    }

    if let Some(group_id) = input.group {
        if groups::find_group_by_id(db_pool, group_id).await?.is_none() {
            errors.add("group", INVALID_GROUP);
        }
    }

    let image = match input.image.filter(|upload| !upload.bytes.is_empty()) {
        Some(upload) => match ImageKind::sniff(&upload.bytes) {
            Some(kind) => Some((upload.bytes, kind)),
            None => {
                errors.add("image", INVALID_IMAGE);
                None
            }
        },
        None => None,
    };

    errors.into_result()?;
    Ok(ValidPost {
        text,
        group_id: input.group,
        image,
    })
}

/// The author is always `author`, whatever the request carried.
pub async fn create_post(
    db_pool: &SqlitePool,
    media: &MediaStore,
    author: &User,
    input: PostInput,
) -> Result<Post> {
    let valid = validate_post(db_pool, input).await?;

    let image = match &valid.image {
        Some((bytes, kind)) => Some(media.save_post_image(bytes, *kind).await?),
        None => None,
    };

    let post = posts::insert_post(
        db_pool,
        NewPost {
            text: valid.text,
            author_id: author.id,
            group_id: valid.group_id,
            image,
        },
    )
    .await?;

    tracing::info!(post_id = post.id, author = %author.username, "post created");
    Ok(post)
}

fn ensure_author(editor: &User, author_id: i64) -> Result<()> {
    match guard::require_author(Some(editor), author_id) {
        Access::Allowed(_) => Ok(()),
        Access::Denied(_) => Err(BlogError::Forbidden("only the author may change this")),
    }
}

pub async fn edit_post(
    db_pool: &SqlitePool,
    media: &MediaStore,
    editor: &User,
    post: &Post,
    input: PostInput,
) -> Result<Post> {
    ensure_author(editor, post.author_id)?;
    let clear_image = input.clear_image;
    let valid = validate_post(db_pool, input).await?;

    let image = match &valid.image {
        Some((bytes, kind)) => Some(media.save_post_image(bytes, *kind).await?),
        None if clear_image => None,
        None => post.image.clone(),
    };

    let updated = posts::update_post(
        db_pool,
        post.id,
        PostChanges {
            text: valid.text,
            group_id: valid.group_id,
            image: image.clone(),
        },
    )
    .await?
    .ok_or(BlogError::NotFound("post"))?;

    if let Some(old) = &post.image {
        if image.as_ref() != Some(old) {
            media.remove(old).await;
        }
    }

    tracing::info!(post_id = post.id, editor = %editor.username, "post edited");
    Ok(updated)
}

pub async fn delete_post(
    db_pool: &SqlitePool,
    media: &MediaStore,
    editor: &User,
    post: &Post,
) -> Result<()> {
    ensure_author(editor, post.author_id)?;
    posts::delete_post(db_pool, post.id).await?;
    if let Some(image) = &post.image {
        media.remove(image).await;
    }

    tracing::info!(post_id = post.id, editor = %editor.username, "post deleted");
    Ok(())
}

fn validate_comment_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(BlogError::Validation(FieldErrors::single("text", REQUIRED)));
    }
    Ok(text)
}

/// The comment is bound to `post_id` from the route, never to client input.
pub async fn add_comment(
    db_pool: &SqlitePool,
    author: &User,
    post_id: i64,
    text: &str,
) -> Result<Comment> {
    posts::find_post_by_id(db_pool, post_id)
        .await?
        .ok_or(BlogError::NotFound("post"))?;
    let text = validate_comment_text(text)?;

    let comment = comments::insert_comment(db_pool, post_id, author.id, text).await?;
    tracing::info!(comment_id = comment.id, post_id, author = %author.username, "comment added");
    Ok(comment)
}

pub async fn edit_comment(
    db_pool: &SqlitePool,
    editor: &User,
    comment: &CommentView,
    text: &str,
) -> Result<Comment> {
    ensure_author(editor, comment.comment.author_id)?;
    let text = validate_comment_text(text)?;

    comments::update_comment(db_pool, comment.comment.id, text)
        .await?
        .ok_or(BlogError::NotFound("comment"))
}

pub async fn delete_comment(db_pool: &SqlitePool, editor: &User, comment: &CommentView) -> Result<()> {
    ensure_author(editor, comment.comment.author_id)?;
    comments::delete_comment(db_pool, comment.comment.id).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following oneself is skipped without complaint.
    SelfIgnored,
}

/// Get-or-create: repeating the request is a no-op.
pub async fn follow_author(db_pool: &SqlitePool, follower: &User, author: &User) -> Result<FollowOutcome> {
    if follower.id == author.id {
        tracing::debug!(user = %follower.username, "ignored self-follow");
        return Ok(FollowOutcome::SelfIgnored);
    }

    let (_, created) = follows::get_or_create_follow(db_pool, follower.id, author.id).await?;
    if created {
        tracing::info!(follower = %follower.username, author = %author.username, "follow created");
        Ok(FollowOutcome::Created)
    } else {
        Ok(FollowOutcome::AlreadyFollowing)
    }
}

/// Removing an edge that does not exist is fine.
pub async fn unfollow_author(db_pool: &SqlitePool, follower: &User, author: &User) -> Result<bool> {
    let removed = follows::delete_follow(db_pool, follower.id, author.id).await?;
    if removed {
        tracing::info!(follower = %follower.username, author = %author.username, "follow removed");
    }
    Ok(removed)
}

/// Strict follow: self-follows and duplicates come back as validation errors
/// instead of being skipped.
pub async fn create_follow(
    db_pool: &SqlitePool,
    follower: &User,
    following: &str,
) -> Result<FollowView> {
    let following = following.trim();
    if following.is_empty() {
        return Err(BlogError::Validation(FieldErrors::single("following", REQUIRED)));
    }

    let Some(author) = users::find_user_by_username(db_pool, following).await? else {
        return Err(BlogError::Validation(FieldErrors::single(
            "following",
            format!("Object with username={following} does not exist."),
        )));
    };
    if author.id == follower.id {
        return Err(BlogError::Validation(FieldErrors::single("following", SELF_FOLLOW)));
    }

    let follow = match follows::insert_follow(db_pool, follower.id, author.id).await {
        Ok(follow) => follow,
        Err(BlogError::Constraint(Constraint::Unique, _)) => {
            return Err(BlogError::Validation(FieldErrors::single(
                FieldErrors::NON_FIELD,
                DUPLICATE_FOLLOW,
            )));
        }
        Err(BlogError::Constraint(Constraint::Check, _)) => {
            return Err(BlogError::Validation(FieldErrors::single("following", SELF_FOLLOW)));
        }
        Err(err) => return Err(err),
    };

    tracing::info!(follower = %follower.username, author = %author.username, "follow created");
    Ok(FollowView {
        follow,
        user_username: follower.username.clone(),
        author_username: author.username,
    })
}
