//! Login through external OAuth providers. There are no local passwords:
//! the first successful login with a provider account registers a user.

use axum::{Router, routing::get};
use rand::{Rng, seq::IndexedRandom};
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState,
    db::{
        User,
        users::{self, NewUser},
    },
    error::{BlogError, Constraint},
};

mod clients;
mod lockin;
mod login;
mod logout;

pub use clients::{ClientProvider, Clients};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}

/// Only same-site paths are followed after login or logout.
pub(crate) fn safe_return_url(return_url: Option<String>) -> String {
    match return_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => url,
        _ => "/".to_owned(),
    }
}

/// Account details a provider reports for the logged-in person.
#[derive(Debug, Clone)]
pub(crate) struct Identity {
    /// `{provider}:{id}`, stable across logins.
    pub subject: String,
    pub email: String,
    /// Preferred username, if the provider has one.
    pub handle: Option<String>,
}

fn clean_handle(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .take(32)
        .collect()
}

fn random_handle() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{}{}",
        adjectives.choose(&mut rng).copied().unwrap_or("Quiet"),
        nouns.choose(&mut rng).copied().unwrap_or("Writer"),
    )
}

const REGISTER_ATTEMPTS: usize = 16;

/// The user behind `identity`, registered on first sight.
pub(crate) async fn find_or_register(db_pool: &SqlitePool, identity: Identity) -> AppResult<User> {
    if let Some(user) = users::find_user_by_idp_subject(db_pool, &identity.subject).await? {
        return Ok(user);
    }

    let base = identity
        .handle
        .as_deref()
        .map(clean_handle)
        .filter(|handle| !handle.is_empty())
        .unwrap_or_else(random_handle);

    let mut username = base.clone();
    for _ in 0..REGISTER_ATTEMPTS {
        let new_user = NewUser {
            username: username.clone(),
            email: identity.email.clone(),
            password_hash: None,
            idp_subject: Some(identity.subject.clone()),
        };
        match users::create_user(db_pool, new_user).await {
            Ok(user) => return Ok(user),
            // The name is taken, or a concurrent login registered the subject.
            Err(BlogError::Constraint(Constraint::Unique, _)) => {
                if let Some(user) = users::find_user_by_idp_subject(db_pool, &identity.subject).await? {
                    return Ok(user);
                }
                tracing::debug!(%username, "username taken");
                username = format!("{base}{}", rand::rng().random_range(1..10_000));
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(format!("no free username derived from {base}").into())
}
