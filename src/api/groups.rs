use axum::{
    Json, debug_handler,
    extract::{Path, State, rejection::PathRejection},
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    AppState,
    db::{Group, groups},
    error::BlogError,
};

use super::ApiResult;

#[derive(Debug, Serialize)]
pub(crate) struct GroupJson {
    id: i64,
    title: String,
    slug: String,
    description: String,
}

impl From<Group> for GroupJson {
    fn from(group: Group) -> Self {
        GroupJson {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(State(db_pool): State<SqlitePool>) -> ApiResult<Json<Vec<GroupJson>>> {
    let groups = groups::list_groups(&db_pool).await?;
    Ok(Json(groups.into_iter().map(GroupJson::from).collect()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn retrieve(
    path: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
) -> ApiResult<Json<GroupJson>> {
    let Path(group_id) = path?;
    let group = groups::find_group_by_id(&db_pool, group_id)
        .await?
        .ok_or(BlogError::NotFound("group"))?;
    Ok(Json(group.into()))
}
