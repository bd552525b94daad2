use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::cache::CacheStore;
use crate::model::{NormalizedArticle, Source};

pub const ARTICLES_SCHEMA_VERSION: u32 = 1;

/// Stored article list. Freshness is decided by `expires_at`; the backing store
/// keeps the entry longer so it can still serve the stale path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedArticles {
    pub schema_version: u32,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub articles: Vec<NormalizedArticle>,
}

impl CachedArticles {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchMeta {
    pub fetched_at: Option<DateTime<Utc>>,
    pub source_counts: BTreeMap<Source, usize>,
    pub failed_sources: Vec<Source>,
}

/// Typed view over a [`CacheStore`]. Backend errors are logged and absorbed.
#[derive(Clone)]
pub struct ArticleCache {
    store: Arc<dyn CacheStore>,
    stale_retention: Duration,
}

impl ArticleCache {
    pub fn new(store: Arc<dyn CacheStore>, stale_retention: Duration) -> Self {
        Self {
            store,
            stale_retention,
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get_raw(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, key, backend = self.store.backend(), "cache read failed");
                counter!("cache_store_errors_total").increment(1);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, key, "cache entry undecodable; ignoring");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, key, "cache entry unserializable");
                return;
            }
        };
        if let Err(e) = self.store.set_raw(key, &raw, ttl).await {
            tracing::warn!(error = %e, key, backend = self.store.backend(), "cache write failed");
            counter!("cache_store_errors_total").increment(1);
        }
    }

    /// Entry regardless of expiry, provided the schema matches.
    pub async fn get_stale(&self, key: &str) -> Option<CachedArticles> {
        self.read::<CachedArticles>(key)
            .await
            .filter(|c| c.schema_version == ARTICLES_SCHEMA_VERSION)
    }

    /// Fresh entries only.
    pub async fn get(&self, key: &str) -> Option<CachedArticles> {
        self.get_stale(key)
            .await
            .filter(|c| c.is_fresh_at(Utc::now()))
    }

    pub async fn set(&self, key: &str, articles: &[NormalizedArticle], ttl: Duration) -> CachedArticles {
        let cached_at = Utc::now();
        let expires_at = cached_at
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let entry = CachedArticles {
            schema_version: ARTICLES_SCHEMA_VERSION,
            cached_at,
            expires_at,
            articles: articles.to_vec(),
        };
        self.write(key, &entry, ttl + self.stale_retention).await;
        tracing::debug!(key, count = articles.len(), "articles cached");
        entry
    }

    pub async fn get_meta(&self, key: &str) -> Option<FetchMeta> {
        self.read(key).await
    }

    pub async fn set_meta(&self, key: &str, meta: &FetchMeta, ttl: Duration) {
        self.write(key, meta, ttl + self.stale_retention).await;
    }
}
