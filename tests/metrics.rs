// tests/metrics.rs
//
// Installs the global Prometheus recorder, so it stays the only test in this binary.
mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{article, FakeAdapter};
use news_curator::cache::{ArticleCache, ArticleFeed, ArticleQuery, MemoryStore};
use news_curator::config::ArticlesConfig;
use news_curator::ingest::types::SourceAdapter;
use news_curator::ingest::Orchestrator;
use news_curator::metrics::Metrics;
use news_curator::model::Source;

#[tokio::test]
async fn metrics_endpoint_exposes_feed_series() {
    let metrics = Metrics::init(1800).expect("install recorder");

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        FakeAdapter::ok(Source::Qiita, vec![article(Source::Qiita, "q1", 1, &[])]),
        FakeAdapter::failing(Source::GitHub),
    ];
    let cfg = ArticlesConfig::default();
    let feed = ArticleFeed::new(
        Orchestrator::new(adapters, Duration::from_secs(5)),
        ArticleCache::new(Arc::new(MemoryStore::new()), cfg.stale_retention()),
        &cfg,
    );
    let query = ArticleQuery {
        sources: vec![Source::Qiita, Source::GitHub],
        ..Default::default()
    };
    feed.serve(&query).await.unwrap();
    feed.serve(&query).await.unwrap();

    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = metrics.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    for series in [
        "feed_cache_ttl_seconds 1800",
        "feed_cache_hits_total 1",
        "feed_cache_misses_total 1",
        "feed_source_errors_total{source=\"github\"} 1",
        "feed_articles_fetched_total{source=\"qiita\"} 1",
    ] {
        assert!(text.contains(series), "missing `{series}` in:\n{text}");
    }
}
