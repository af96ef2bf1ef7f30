//! Authorization checks composed in front of every mutation.
//!
//! Guards only decide; each surface picks its own reaction to a denial
//! (pages bounce with a redirect, the API answers 401/403).

use crate::db::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No one is logged in.
    Anonymous,
    /// Logged in, but the object belongs to someone else.
    NotAuthor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<'a> {
    Allowed(&'a User),
    Denied(Denial),
}

impl<'a> Access<'a> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allowed(_))
    }
}

pub fn require_login(viewer: Option<&User>) -> Access<'_> {
    match viewer {
        Some(user) => Access::Allowed(user),
        None => Access::Denied(Denial::Anonymous),
    }
}

/// Allowed only for the object's author.
pub fn require_author(viewer: Option<&User>, author_id: i64) -> Access<'_> {
    match require_login(viewer) {
        Access::Allowed(user) if user.id == author_id => Access::Allowed(user),
        Access::Allowed(_) => Access::Denied(Denial::NotAuthor),
        denied => denied,
    }
}
