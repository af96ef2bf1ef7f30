use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState, res,
    session::{self, CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
};

use super::{Clients, clients::ClientProvider, safe_return_url};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Serialize)]
struct ProviderLink {
    slug: &'static str,
    name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let return_url = safe_return_url(return_url);
    if session::viewer(&session, &db_pool).await?.is_some() {
        return Ok(Redirect::to(&return_url).into_response());
    }

    let providers: Vec<ProviderLink> = clients
        .providers()
        .into_iter()
        .map(|provider| ProviderLink {
            slug: provider.slug(),
            name: provider.to_string(),
        })
        .collect();

    let mut ctx = res::page_context("Log in", None);
    ctx.insert("providers", &providers);
    ctx.insert("return_url", &return_url);
    Ok(res::render("login.html", &ctx)?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    Path(provider): Path<ClientProvider>,
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes().iter().map(|scope| Scope::new((*scope).to_owned())))
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    session.insert(RETURN_URL, safe_return_url(return_url)).await?;

    tracing::debug!(%provider, "redirecting to provider");
    Ok(Redirect::to(authorize_url.as_str()).into_response())
}
