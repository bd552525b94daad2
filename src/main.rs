//! news-curator: Shuttle entrypoint.
//! Loads configuration, wires adapters, cache and translator, and serves the Axum router.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use news_curator::{api, logging, metrics::Metrics, AppConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    logging::init();

    let cfg = AppConfig::load().context("loading news-curator config")?;
    tracing::info!(
        cache_backend = ?cfg.cache.backend,
        ttl_secs = cfg.articles.cache_ttl_secs,
        per_source_limit = cfg.articles.per_source_limit,
        "configuration loaded"
    );

    let state = api::AppState::from_config(&cfg)?;
    let mut router = api::router(state);

    match Metrics::init(cfg.articles.cache_ttl_secs) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics recorder unavailable; /metrics disabled"),
    }

    Ok(router.into())
}
