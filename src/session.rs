use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, db::{User, users}};

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// The logged-in user, if the session names one that still exists.
pub async fn viewer(session: &Session, db_pool: &SqlitePool) -> AppResult<Option<User>> {
    let Some(user_id) = session.get::<i64>(USER_ID).await? else {
        return Ok(None);
    };

    let user = users::find_user_by_id(db_pool, user_id).await?;
    if user.is_none() {
        tracing::debug!(user_id, "session refers to a missing user");
        session.remove::<i64>(USER_ID).await?;
    }
    Ok(user)
}
