use std::fmt;

use oauth2::{AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, TokenUrl, basic::BasicClient};
use serde::Deserialize;
use serde_json::Value;

use crate::{AppResult, GetField};

type ProviderClient = Client<
    oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>,
    oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    oauth2::StandardRevocableToken,
    oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    pub const ALL: [ClientProvider; 2] = [ClientProvider::Google, ClientProvider::Github];

    /// Path segment in `/login/{provider}` and `/lockin/{provider}`.
    pub fn slug(self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    fn endpoints(self) -> (&'static str, &'static str) {
        use ClientProvider::*;
        match self {
            Google => (
                "https://accounts.google.com/o/oauth2/auth",
                "https://oauth2.googleapis.com/token",
            ),
            Github => (
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
            ),
        }
    }

    pub(crate) fn userinfo_url(self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://openidconnect.googleapis.com/v1/userinfo",
            Github => "https://api.github.com/user",
        }
    }

    pub(crate) fn scopes(self) -> &'static [&'static str] {
        use ClientProvider::*;
        match self {
            Google => &["openid", "email", "profile"],
            Github => &["read:user", "user:email"],
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Configured OAuth clients. Providers missing from the key file are not
/// offered on the login page.
#[derive(Clone, Default)]
pub struct Clients {
    google_client: Option<ProviderClient>,
    github_client: Option<ProviderClient>,
}

fn build_client(provider: ClientProvider, json: &Value, public_url: &str) -> AppResult<ProviderClient> {
    let client_id = ClientId::new(json.get_str_field("client_id")?);
    let client_secret = ClientSecret::new(json.get_str_field("client_secret")?);

    let (auth_url, token_url) = provider.endpoints();
    let auth_url = AuthUrl::new(auth_url.to_owned())?;
    let token_url = TokenUrl::new(token_url.to_owned())?;
    let redirect_url = RedirectUrl::new(format!("{public_url}/lockin/{}", provider.slug()))?;

    Ok(BasicClient::new(client_id)
        .set_client_secret(client_secret)
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url))
}

impl Clients {
    /// Reads `{"google": {"client_id", "client_secret"}, "github": {..}}`.
    /// `public_url` is where the providers send the user back to.
    pub fn from_json(json: Value, public_url: &str) -> AppResult<Clients> {
        let public_url = public_url.trim_end_matches('/');
        let mut clients = Clients::default();

        for provider in ClientProvider::ALL {
            let Some(section) = json.get(provider.slug()) else {
                continue;
            };
            let client = build_client(provider, section, public_url)?;
            match provider {
                ClientProvider::Google => clients.google_client = Some(client),
                ClientProvider::Github => clients.github_client = Some(client),
            }
        }

        Ok(clients)
    }

    pub fn providers(&self) -> Vec<ClientProvider> {
        ClientProvider::ALL
            .into_iter()
            .filter(|provider| self.get_client(*provider).is_ok())
            .collect()
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<ProviderClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }
        .ok_or(format!("OAuth provider {provider} keys not supplied").into())
    }
}
