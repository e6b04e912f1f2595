//! Silver market dashboard backend: binary entrypoint.
//! Boots the Axum HTTP server with the snapshot pipeline, dashboards and
//! metrics wired in.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable tracing logs in development only.
/// Activation requires AGFORECAST_DEV_LOG=1; AGFORECAST_LOG_FORMAT=json
/// switches to JSON lines.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("AGFORECAST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !dev_flag {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agforecast=info,warn"));
    let json = std::env::var("AGFORECAST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // try_init: the host runtime may already own the global subscriber
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if let Err(e) = res {
        eprintln!("dev tracing not installed: {e}");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let router = agforecast::app().await?;
    Ok(router.into())
}
