use std::str::FromStr;

use anyhow::Context;
use inkwell::{AppState, app, auth, config::Config, db};
use tower_sessions::MemoryStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwell=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let clients = match &config.oauth_clients {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            auth::Clients::from_json(serde_json::Value::from_str(&raw)?, &config.public_url)
                .map_err(|err| err.0)?
        }
        None => {
            tracing::warn!("OAUTH_CLIENTS not set, login is disabled");
            auth::Clients::default()
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app = app(AppState::new(db_pool, clients, config), MemoryStore::default());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
