use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::header::USER_AGENT,
    response::{IntoResponse, Redirect},
};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState, GetField,
    session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID},
};

use super::{Clients, Identity, clients::ClientProvider, find_or_register, safe_return_url};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// Maps a provider's userinfo document onto an [`Identity`].
fn identity(provider: ClientProvider, body: &Value) -> AppResult<Identity> {
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    match provider {
        ClientProvider::Google => Ok(Identity {
            subject: format!("{}:{}", provider.slug(), body.get_str_field("sub")?),
            handle: email.split('@').next().map(str::to_owned),
            email,
        }),
        ClientProvider::Github => {
            let id = body
                .get("id")
                .and_then(Value::as_i64)
                .ok_or(format!("expected numeric id in {body}"))?;
            Ok(Identity {
                subject: format!("{}:{id}", provider.slug()),
                handle: body.get("login").and_then(Value::as_str).map(str::to_owned),
                email,
            })
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err("no csrf_state")?;
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err("csrf tokens don't match")?;
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier")?;
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let body: Value = http_client
        .get(provider.userinfo_url())
        .bearer_auth(access_token)
        .header(USER_AGENT, concat!("inkwell/", env!("CARGO_PKG_VERSION")))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let user = find_or_register(&db_pool, identity(provider, &body)?).await?;

    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await?;
    tracing::info!(user_id = user.id, username = %user.username, %provider, "logged in");

    let return_url = safe_return_url(session.remove::<String>(RETURN_URL).await?);
    Ok(Redirect::to(return_url.as_str()))
}
