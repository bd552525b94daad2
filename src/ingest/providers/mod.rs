// src/ingest/providers/mod.rs
pub mod github;
pub mod hackernews;
pub mod qiita;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Response};

use crate::config::app::USER_AGENT;
use crate::config::AppConfig;
use crate::error::CuratorError;
use crate::ingest::types::SourceAdapter;
use crate::model::Source;

pub use github::GitHubAdapter;
pub use hackernews::HackerNewsAdapter;
pub use qiita::QiitaAdapter;

/// Shared reqwest client for adapters, the cache and the translator.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()
        .context("building http client")
}

/// Turn a non-2xx response into `SourceUnavailable`, keeping the body excerpt.
pub(crate) async fn ensure_success(origin: Source, resp: Response) -> Result<Response, CuratorError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let reason = status.canonical_reason().unwrap_or("error");
    let excerpt = crate::ingest::truncate_chars(body.trim(), 200, true);
    let message = if excerpt.is_empty() {
        reason.to_string()
    } else {
        format!("{reason}: {excerpt}")
    };
    Err(CuratorError::SourceUnavailable {
        origin,
        status: Some(status.as_u16()),
        message,
    })
}

/// Every source adapter, configured from endpoints and credentials.
pub fn default_adapters(cfg: &AppConfig, client: &Client) -> Vec<Arc<dyn SourceAdapter>> {
    let ep = &cfg.endpoints;
    let creds = &cfg.credentials;
    vec![
        Arc::new(QiitaAdapter::new(
            client.clone(),
            &ep.qiita_api,
            creds.qiita_access_token.clone(),
        )),
        Arc::new(HackerNewsAdapter::new(
            client.clone(),
            &ep.hacker_news_api,
            cfg.articles.hn_detail_concurrency,
        )),
        Arc::new(GitHubAdapter::new(
            client.clone(),
            &ep.github_api,
            creds.github_token.clone(),
        )),
    ]
}
