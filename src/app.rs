/*
 * Responsibility
 * - Tracing and panic hook setup
 * - Config -> AppState
 * - Authenticate once, then list users through the management API
 */
use std::{panic, process};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use okta_dpop_client::api::v1::USERS_PATH;
use okta_dpop_client::config::Config;
use okta_dpop_client::state::AppState;

fn init_tracing() {
    // RUST_LOG wins when set, e.g.
    // RUST_LOG=info,okta_dpop_client=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr may not be captured; make sure panics reach the log.
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting in {:?} mode against {}",
        config.app_env,
        config.identity.domain
    );

    let state = AppState::from_config(&config)?;

    if let Err(e) = state.tokens.authenticate().await {
        tracing::error!(error = %e, "authentication failed");
        return Err(e).context("could not obtain an access token");
    }

    let resp = state.api.call(USERS_PATH, Method::GET, None, None).await?;
    let status = resp.status();
    if status == StatusCode::OK {
        let users: serde_json::Value = resp
            .json()
            .await
            .context("users response is not JSON")?;
        println!("Users List: {}\n", users);
    } else {
        let body = resp.text().await.unwrap_or_default();
        tracing::error!(%status, body = %body, "API error");
    }

    Ok(())
}
