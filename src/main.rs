//! Review sentiment service: binary entrypoint.
//! Boots the Axum HTTP server with the shared classifier handle.

use review_sentiment::api::{self, AppState};
use review_sentiment::classifier::start_hot_reload_thread;
use review_sentiment::config::{is_dev_env, ServiceConfig};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs in development only.
/// Requires a dev environment AND REVIEW_DEV_LOG=1.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("REVIEW_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    if !(dev_flag && is_dev_env()) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_sentiment=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // .env is optional; absent in production.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let config = ServiceConfig::from_env();
    let lexicon_path = config.lexicon_path.clone();
    let hot_reload = config.hot_reload;

    let state = AppState::from_config(config)?;
    if hot_reload {
        start_hot_reload_thread(state.classifier.clone(), lexicon_path.clone());
    }
    info!(path = %lexicon_path.display(), hot_reload, "classifier ready");

    Ok(api::router(state).into())
}
