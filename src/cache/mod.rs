// src/cache/mod.rs
//! Key/value cache for article lists and translations.
//!
//! Backends speak raw strings with a TTL; [`ArticleCache`] layers the versioned
//! JSON envelopes on top.

pub mod articles;
pub mod feed;
pub mod memory;
pub mod upstash;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::describe_counter;
use once_cell::sync::OnceCell;
use reqwest::Client;

use crate::config::{CacheBackend, RedisCredentials};
use crate::error::CuratorError;
use crate::model::Source;

pub use articles::{ArticleCache, CachedArticles, FetchMeta};
pub use feed::{ArticleFeed, ArticleQuery, ServedArticles};
pub use memory::MemoryStore;
pub use upstash::UpstashStore;

pub const ARTICLES_PREFIX: &str = "cache:articles:";
pub const META_PREFIX: &str = "cache:meta:";
pub const TRANSLATION_PREFIX: &str = "cache:translation:";

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_cache_hits_total", "Article requests served from a fresh cache entry.");
        describe_counter!("feed_cache_misses_total", "Article requests that went upstream.");
        describe_counter!("feed_stale_served_total", "Expired entries served after upstream failure.");
        describe_counter!("cache_store_errors_total", "Absorbed cache backend errors.");
    });
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn get_raw(&self, key: &str) -> Result<Option<String>, CuratorError>;

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CuratorError>;
}

/// Always empty, never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl CacheStore for NoopStore {
    fn backend(&self) -> &'static str {
        "none"
    }

    async fn get_raw(&self, _key: &str) -> Result<Option<String>, CuratorError> {
        Ok(None)
    }

    async fn set_raw(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CuratorError> {
        Ok(())
    }
}

/// Pick the backend. Missing Upstash credentials degrade, never fail.
pub fn select_store(
    backend: CacheBackend,
    redis: Option<&RedisCredentials>,
    client: Client,
) -> Arc<dyn CacheStore> {
    let store: Arc<dyn CacheStore> = match (backend, redis) {
        (CacheBackend::None, _) => Arc::new(NoopStore),
        (CacheBackend::Memory, _) | (CacheBackend::Auto, None) => Arc::new(MemoryStore::new()),
        (CacheBackend::Auto | CacheBackend::Upstash, Some(creds)) => {
            Arc::new(UpstashStore::new(client, &creds.url, &creds.token))
        }
        (CacheBackend::Upstash, None) => {
            tracing::warn!("cache backend 'upstash' selected but no REST credentials set; caching disabled");
            Arc::new(NoopStore)
        }
    };
    tracing::info!(backend = store.backend(), "cache backend selected");
    store
}

/// Key suffix for a source selection: one source by name, everything as `all`,
/// other combinations sorted and joined with `+`. A strict subset never shares
/// the `all` entry, so a partial payload cannot replace the complete one.
pub fn key_suffix(sources: &[Source]) -> String {
    let mut v = sources.to_vec();
    v.sort();
    v.dedup();
    if v.is_empty() || v.len() == Source::ALL.len() {
        return "all".to_string();
    }
    v.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("+")
}

pub fn articles_key(sources: &[Source]) -> String {
    format!("{ARTICLES_PREFIX}{}", key_suffix(sources))
}

pub fn meta_key(sources: &[Source]) -> String {
    format!("{META_PREFIX}{}", key_suffix(sources))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_source_selection() {
        assert_eq!(articles_key(&[Source::Qiita]), "cache:articles:qiita");
        assert_eq!(articles_key(&[]), "cache:articles:all");
        assert_eq!(
            articles_key(&[Source::GitHub, Source::HackerNews, Source::Qiita]),
            "cache:articles:all"
        );
        assert_eq!(
            articles_key(&[Source::GitHub, Source::Qiita, Source::GitHub]),
            "cache:articles:qiita+github"
        );
        assert_eq!(meta_key(&[Source::HackerNews]), "cache:meta:hackernews");
    }

    #[test]
    fn subset_key_never_aliases_all() {
        let all = articles_key(&Source::ALL);
        for pair in [
            [Source::Qiita, Source::HackerNews],
            [Source::HackerNews, Source::GitHub],
            [Source::GitHub, Source::Qiita],
        ] {
            let key = articles_key(&pair);
            assert_ne!(key, all);
            let mut reversed = pair;
            reversed.reverse();
            assert_eq!(articles_key(&reversed), key);
        }
    }

    #[test]
    fn backend_selection_degrades() {
        let client = Client::new();
        let creds = RedisCredentials {
            url: "https://kv.test".into(),
            token: "t".into(),
        };
        assert_eq!(select_store(CacheBackend::Auto, None, client.clone()).backend(), "memory");
        assert_eq!(
            select_store(CacheBackend::Auto, Some(&creds), client.clone()).backend(),
            "upstash"
        );
        assert_eq!(select_store(CacheBackend::Upstash, None, client.clone()).backend(), "none");
        assert_eq!(select_store(CacheBackend::None, Some(&creds), client).backend(), "none");
    }
}
