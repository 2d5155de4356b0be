//! Opportunity Aggregator binary entrypoint.
//! Boots the Axum HTTP server with the aggregation core and `/metrics`.

use opportunity_aggregator::{api, build_aggregator, metrics::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires AGGREGATOR_DEV_LOG=1; hosted runs keep the
/// runtime's own subscriber.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("AGGREGATOR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !dev_flag {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("opportunity_aggregator=info,ingest=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let metrics = Metrics::init()?;
    let aggregator = build_aggregator()?;

    let router = api::router(api::AppState::new(aggregator)).merge(metrics.router());

    Ok(router.into())
}
