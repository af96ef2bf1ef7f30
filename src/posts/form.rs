use std::collections::HashMap;

use axum::{
    debug_handler,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    db::{Group, Post, User, groups, posts},
    error::{BlogError, FieldErrors},
    guard::{self, Access, Denial},
    media::{self, MediaStore, Upload},
    mutations::{self, INVALID_GROUP, PostInput},
    res, session,
};

use super::parse_post_id;

/// What the form shows: blank for a new post, the stored values when
/// editing, or the submitted values after a failed validation.
struct FormState<'a> {
    text: &'a str,
    group: Option<i64>,
    current_image: Option<&'a str>,
    errors: &'a FieldErrors,
}

enum Mode {
    Create,
    Edit(i64),
}

#[derive(Serialize)]
struct GroupOption<'a> {
    id: i64,
    title: &'a str,
    selected: bool,
}

fn render_form(viewer: &User, mode: Mode, groups: &[Group], state: FormState) -> AppResult<Response> {
    let (title, action, submit) = match mode {
        Mode::Create => ("New post", "/create/".to_owned(), "Publish"),
        Mode::Edit(id) => ("Edit post", format!("/posts/{id}/edit/"), "Save"),
    };

    let groups: Vec<GroupOption> = groups
        .iter()
        .map(|group| GroupOption {
            id: group.id,
            title: &group.title,
            selected: state.group == Some(group.id),
        })
        .collect();
    let errors = HashMap::from([
        ("non_field", state.errors.get(FieldErrors::NON_FIELD)),
        ("text", state.errors.get("text")),
        ("group", state.errors.get("group")),
        ("image", state.errors.get("image")),
    ]);

    let mut ctx = res::page_context(title, Some(viewer));
    ctx.insert("action", &action);
    ctx.insert("submit", submit);
    ctx.insert("text", state.text);
    ctx.insert("groups", &groups);
    ctx.insert("image_url", &state.current_image.map(media::media_url));
    ctx.insert("errors", &errors);

    Ok(res::render("create_post.html", &ctx)?.into_response())
}

/// Reads the multipart post form. Malformed values the validation layer
/// never sees (an unparsable group id) come back as field errors.
async fn read_form(mut multipart: Multipart) -> AppResult<(PostInput, FieldErrors)> {
    let mut input = PostInput::default();
    let mut errors = FieldErrors::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("text") => input.text = field.text().await?,
            Some("group") => {
                let raw = field.text().await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    match raw.parse() {
                        Ok(id) => input.group = Some(id),
                        Err(_) => errors.add("group", INVALID_GROUP),
                    }
                }
            }
            Some("image") => {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    input.image = Some(Upload {
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Some("image-clear") => {
                field.bytes().await?;
                input.clear_image = true;
            }
            _ => {
                field.bytes().await?;
            }
        }
    }

    Ok((input, errors))
}

#[debug_handler]
pub(crate) async fn create_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let Access::Allowed(author) = guard::require_login(viewer.as_ref()) else {
        return Ok(res::login_redirect("/create/"));
    };

    let groups = groups::list_groups(&db_pool).await?;
    render_form(
        author,
        Mode::Create,
        &groups,
        FormState {
            text: "",
            group: None,
            current_image: None,
            errors: &FieldErrors::new(),
        },
    )
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let Access::Allowed(author) = guard::require_login(viewer.as_ref()) else {
        return Ok(res::login_redirect("/create/"));
    };
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let (input, errors) = read_form(multipart).await?;
    let errors = if errors.is_empty() {
        match mutations::create_post(&db_pool, &media, author, input.clone()).await {
            Ok(_) => {
                return Ok(Redirect::to(&format!("/profile/{}/", author.username)).into_response());
            }
            Err(BlogError::Validation(errors)) => errors,
            Err(err) => return Err(err.into()),
        }
    } else {
        errors
    };

    let groups = groups::list_groups(&db_pool).await?;
    render_form(
        author,
        Mode::Create,
        &groups,
        FormState {
            text: &input.text,
            group: input.group,
            current_image: None,
            errors: &errors,
        },
    )
}

/// Resolves the post to edit, or the response that replaces the form:
/// guests go to the login page, other users back to the post.
async fn editable_post<'a>(
    db_pool: &SqlitePool,
    viewer: Option<&'a User>,
    raw_id: &str,
) -> AppResult<Result<(&'a User, Post), Response>> {
    let Access::Allowed(_) = guard::require_login(viewer) else {
        return Ok(Err(res::login_redirect(&format!("/posts/{raw_id}/edit/"))));
    };

    let post_id = parse_post_id(raw_id)?;
    let post = posts::find_post_by_id(db_pool, post_id)
        .await?
        .ok_or(BlogError::NotFound("post"))?;

    match guard::require_author(viewer, post.author_id) {
        Access::Allowed(editor) => Ok(Ok((editor, post))),
        Access::Denied(Denial::NotAuthor | Denial::Anonymous) => {
            tracing::debug!(post_id, "edit by non-author bounced to detail page");
            Ok(Err(Redirect::to(&format!("/posts/{post_id}/")).into_response()))
        }
    }
}

#[debug_handler]
pub(crate) async fn edit_page(
    Path(raw_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let (editor, post) = match editable_post(&db_pool, viewer.as_ref(), &raw_id).await? {
        Ok(found) => found,
        Err(bounce) => return Ok(bounce),
    };

    let groups = groups::list_groups(&db_pool).await?;
    render_form(
        editor,
        Mode::Edit(post.id),
        &groups,
        FormState {
            text: &post.text,
            group: post.group_id,
            current_image: post.image.as_deref(),
            errors: &FieldErrors::new(),
        },
    )
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit(
    Path(raw_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let (editor, post) = match editable_post(&db_pool, viewer.as_ref(), &raw_id).await? {
        Ok(found) => found,
        Err(bounce) => return Ok(bounce),
    };
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let (input, errors) = read_form(multipart).await?;
    let errors = if errors.is_empty() {
        match mutations::edit_post(&db_pool, &media, editor, &post, input.clone()).await {
            Ok(_) => return Ok(Redirect::to(&format!("/posts/{}/", post.id)).into_response()),
            Err(BlogError::Validation(errors)) => errors,
            Err(err) => return Err(err.into()),
        }
    } else {
        errors
    };

    let groups = groups::list_groups(&db_pool).await?;
    render_form(
        editor,
        Mode::Edit(post.id),
        &groups,
        FormState {
            text: &input.text,
            group: input.group,
            current_image: post.image.as_deref(),
            errors: &errors,
        },
    )
}
