//! Cache-first article serving with a stale fallback.

use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::cache::{articles_key, meta_key, ArticleCache, FetchMeta};
use crate::config::ArticlesConfig;
use crate::error::CuratorError;
use crate::ingest::types::FetchOptions;
use crate::ingest::{matches_any_tag_ignore_case, Orchestrator};
use crate::model::{NormalizedArticle, Source};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    /// Empty means every source.
    pub sources: Vec<Source>,
    pub tags: Vec<String>,
    /// Legacy single tag, used when `tags` is empty.
    pub tag: Option<String>,
    pub limit: Option<usize>,
    pub refresh: bool,
}

impl ArticleQuery {
    fn wanted_tags(&self) -> Vec<String> {
        if self.tags.is_empty() {
            self.tag.iter().cloned().collect()
        } else {
            self.tags.clone()
        }
    }

    fn requested_sources(&self) -> Vec<Source> {
        if self.sources.is_empty() {
            Source::ALL.to_vec()
        } else {
            let mut v = self.sources.clone();
            v.sort();
            v.dedup();
            v
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServedArticles {
    pub articles: Vec<NormalizedArticle>,
    pub sources: Vec<Source>,
    pub from_cache: bool,
    pub stale: bool,
    pub cached_at: DateTime<Utc>,
    pub failed_sources: Vec<Source>,
}

#[derive(Clone)]
pub struct ArticleFeed {
    orchestrator: Orchestrator,
    cache: ArticleCache,
    ttl: Duration,
    per_source_limit: usize,
    days: u32,
}

impl ArticleFeed {
    pub fn new(orchestrator: Orchestrator, cache: ArticleCache, cfg: &ArticlesConfig) -> Self {
        Self {
            orchestrator,
            cache,
            ttl: cfg.cache_ttl(),
            per_source_limit: cfg.per_source_limit,
            days: cfg.days,
        }
    }

    pub fn cache(&self) -> &ArticleCache {
        &self.cache
    }

    fn shape(&self, q: &ArticleQuery, sources: &[Source], articles: Vec<NormalizedArticle>) -> Vec<NormalizedArticle> {
        let wanted = q.wanted_tags();
        let mut out: Vec<NormalizedArticle> = articles
            .into_iter()
            .filter(|a| sources.contains(&a.source))
            .filter(|a| matches_any_tag_ignore_case(a, &wanted))
            .collect();
        if let Some(limit) = q.limit {
            out.truncate(limit);
        }
        out
    }

    /// 1. fresh cache hit (unless `refresh`)
    /// 2. orchestrator run, cached when at least one source succeeded
    /// 3. stale entry when every source failed, else `AllSourcesFailed`
    pub async fn serve(&self, q: &ArticleQuery) -> Result<ServedArticles, CuratorError> {
        crate::cache::ensure_metrics_described();
        let sources = q.requested_sources();
        let key = articles_key(&sources);

        if !q.refresh {
            if let Some(hit) = self.cache.get(&key).await {
                counter!("feed_cache_hits_total").increment(1);
                tracing::debug!(key = %key, count = hit.articles.len(), "cache hit");
                let failed_sources = self
                    .cache
                    .get_meta(&meta_key(&sources))
                    .await
                    .map(|m| m.failed_sources)
                    .unwrap_or_default();
                return Ok(ServedArticles {
                    articles: self.shape(q, &sources, hit.articles),
                    sources,
                    from_cache: true,
                    stale: false,
                    cached_at: hit.cached_at,
                    failed_sources,
                });
            }
        }
        counter!("feed_cache_misses_total").increment(1);

        // Fetch untagged so the cached payload serves every tag query.
        let options = FetchOptions {
            limit: Some(self.per_source_limit),
            days: Some(self.days),
            ..Default::default()
        };
        let outcome = self.orchestrator.fetch_all(&sources, &options).await;

        if !outcome.all_failed() {
            let entry = self.cache.set(&key, &outcome.articles, self.ttl).await;
            let meta = FetchMeta {
                fetched_at: Some(entry.cached_at),
                source_counts: outcome.source_counts.clone(),
                failed_sources: outcome.failed_sources(),
            };
            self.cache.set_meta(&meta_key(&sources), &meta, self.ttl).await;
            tracing::info!(
                key = %key,
                count = entry.articles.len(),
                failed = meta.failed_sources.len(),
                "articles refreshed"
            );
            return Ok(ServedArticles {
                articles: self.shape(q, &sources, entry.articles),
                sources,
                from_cache: false,
                stale: false,
                cached_at: entry.cached_at,
                failed_sources: meta.failed_sources,
            });
        }

        match self.cache.get_stale(&key).await {
            Some(stale) => {
                counter!("feed_stale_served_total").increment(1);
                tracing::warn!(key = %key, cached_at = %stale.cached_at, "all sources failed; serving stale cache");
                Ok(ServedArticles {
                    articles: self.shape(q, &sources, stale.articles),
                    failed_sources: outcome.failed_sources(),
                    sources,
                    from_cache: true,
                    stale: true,
                    cached_at: stale.cached_at,
                })
            }
            None => {
                tracing::error!(key = %key, "all sources failed and nothing cached");
                Err(outcome.into_error())
            }
        }
    }
}
