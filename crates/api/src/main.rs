//! Plansync service binary

use std::path::Path;

use anyhow::Context as _;
use plansync_api::{build_router, AppContext};
use plansync_domain::Config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    plansync_api::logging::init_tracing();

    let config = load_config()?;
    let bind_address = config.server.bind_address.clone();
    let context = AppContext::new(config).context("failed to build application context")?;

    context.scheduler.start().await;

    // Push mode is self-configuring when a public callback URL is known;
    // failure degrades to polling.
    if let Ok(callback_url) = std::env::var("PLANSYNC_WEBHOOK_URL") {
        match context.polling.ensure_webhook(&callback_url).await {
            Ok(hook) => info!(webhook_id = hook.id, "webhook subscription active"),
            Err(err) => warn!(error = %err, "webhook registration failed, relying on polling"),
        }
    }

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!(address = bind_address.as_str(), "plansync listening");

    axum::serve(listener, build_router(context)).await.context("server terminated")?;
    Ok(())
}

/// Read the TOML config file, then apply environment overrides. A
/// missing file falls back to defaults so a fresh checkout still boots.
fn load_config() -> anyhow::Result<Config> {
    let path =
        std::env::var("PLANSYNC_CONFIG").unwrap_or_else(|_| "plansync.toml".to_string());

    let mut config = if Path::new(&path).exists() {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {path}"))?;
        Config::from_toml_str(&raw).with_context(|| format!("invalid config file {path}"))?
    } else {
        warn!(path = path.as_str(), "config file not found, using defaults");
        Config::default()
    };

    if let Ok(token) = std::env::var("PLANSYNC_ACCESS_TOKEN") {
        config.remote.access_token = Some(token);
    }
    Ok(config)
}
