use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::analyze::{
    filter_articles, scoring, tag_counts, Category, FilterPredicate, ScoringConfig, TagMode,
};
use crate::cache::{select_store, ArticleCache, ArticleFeed, ArticleQuery};
use crate::config::AppConfig;
use crate::error::CuratorError;
use crate::ingest::providers::{default_adapters, http_client};
use crate::ingest::Orchestrator;
use crate::model::{NormalizedArticle, Source};
use crate::translate::{GoogleTranslator, TranslationOutcome, TranslationProvider, Translator};

#[derive(Clone)]
pub struct AppState {
    feed: Arc<ArticleFeed>,
    translator: Arc<Translator>,
    scoring: ScoringConfig,
}

impl AppState {
    pub fn new(feed: ArticleFeed, translator: Translator, scoring: ScoringConfig) -> Self {
        Self {
            feed: Arc::new(feed),
            translator: Arc::new(translator),
            scoring,
        }
    }

    /// Wire adapters, cache backend and translator from configuration.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let creds = &cfg.credentials;
        let ep = &cfg.endpoints;
        let client = http_client(cfg.articles.fetch_timeout())?;

        let adapters = default_adapters(cfg, &client);
        let orchestrator = Orchestrator::new(adapters, cfg.articles.fetch_timeout());

        let store = select_store(cfg.cache.backend, creds.redis.as_ref(), client.clone());
        let cache = ArticleCache::new(store.clone(), cfg.articles.stale_retention());
        let feed = ArticleFeed::new(orchestrator, cache, &cfg.articles);

        let provider: Option<Arc<dyn TranslationProvider>> =
            creds.google_translate_api_key.as_ref().map(|key| {
                Arc::new(GoogleTranslator::new(client.clone(), &ep.google_translate_api, key))
                    as Arc<dyn TranslationProvider>
            });
        if provider.is_none() {
            tracing::info!("GOOGLE_TRANSLATE_API_KEY not set; translations will be mocked");
        }
        let translator = Translator::new(store, provider, cfg.translation.clone());

        Ok(Self::new(feed, translator, cfg.scoring))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/articles", get(get_articles))
        .route("/translate", post(post_translate))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesParams {
    sources: Option<String>,
    tags: Option<String>,
    tag: Option<String>,
    limit: Option<String>,
    refresh: Option<String>,
    translate: Option<String>,
    keyword: Option<String>,
    tag_mode: Option<String>,
    categories: Option<String>,
    sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortMode {
    Recent,
    Score,
}

fn csv(s: &Option<String>) -> Vec<String> {
    s.as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(name: &str, v: &Option<String>) -> Result<bool, CuratorError> {
    match v.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(s) => match s.as_str() {
            "" | "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(CuratorError::InvalidRequest(format!("{name} must be a boolean"))),
        },
    }
}

/// Validated form of the `/articles` query string.
struct ArticlesRequest {
    query: ArticleQuery,
    limit: Option<usize>,
    translate: bool,
    predicate: FilterPredicate,
    sort: SortMode,
}

impl ArticlesParams {
    fn validate(&self) -> Result<ArticlesRequest, CuratorError> {
        let sources = csv(&self.sources)
            .iter()
            .map(|s| s.parse::<Source>())
            .collect::<Result<Vec<_>, _>>()?;

        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => match s.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(CuratorError::InvalidRequest(
                        "limit must be a positive integer".to_string(),
                    ))
                }
            },
        };

        let tag_mode = match self.tag_mode.as_deref() {
            None => None,
            Some(s) => Some(s.parse::<TagMode>()?),
        };
        let sort = match self.sort.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
            None => SortMode::Recent,
            Some(s) if s.is_empty() || s == "recent" => SortMode::Recent,
            Some(s) if s == "score" => SortMode::Score,
            Some(other) => {
                return Err(CuratorError::InvalidRequest(format!(
                    "sort must be 'recent' or 'score', got '{other}'"
                )))
            }
        };
        let categories = csv(&self.categories)
            .iter()
            .map(|c| c.parse::<Category>())
            .collect::<Result<HashSet<_>, _>>()?;

        let tags = csv(&self.tags);
        let tag = self
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);

        // The feed only ORs tags; an explicit AND re-checks every requested tag
        // with the same case-insensitive rule.
        let selected_tags = match tag_mode {
            Some(TagMode::And) if tags.is_empty() => tag.iter().cloned().collect(),
            Some(TagMode::And) => tags.iter().cloned().collect(),
            _ => HashSet::new(),
        };
        let predicate = FilterPredicate {
            selected_tags,
            search_keyword: self.keyword.clone().unwrap_or_default(),
            tag_mode: tag_mode.unwrap_or_default(),
            selected_categories: categories,
            tags_ignore_case: true,
            ..Default::default()
        };

        Ok(ArticlesRequest {
            query: ArticleQuery {
                sources,
                tags,
                tag,
                limit: None,
                refresh: parse_bool("refresh", &self.refresh)?,
            },
            limit,
            translate: parse_bool("translate", &self.translate)?,
            predicate,
            sort,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse {
    pub articles: Vec<NormalizedArticle>,
    pub sources: Vec<Source>,
    pub count: usize,
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    pub cached_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<NormalizedArticle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_mock: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sources: Vec<Source>,
    /// Tag frequencies over the fetched feed, before in-memory filtering.
    #[serde(default)]
    pub tag_counts: Vec<TagCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

async fn get_articles(
    State(state): State<AppState>,
    Query(params): Query<ArticlesParams>,
) -> Result<Json<ArticlesResponse>, CuratorError> {
    let req = params.validate()?;
    let served = state.feed.serve(&req.query).await?;

    let counts = tag_counts(&served.articles)
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();

    let mut articles = served.articles;
    if !req.predicate.is_empty() {
        articles = filter_articles(&articles, &req.predicate);
    }

    let now = Utc::now();
    if req.sort == SortMode::Score {
        articles = scoring::sort_by_score_at(&articles, &state.scoring, now);
    }
    if let Some(limit) = req.limit {
        articles.truncate(limit);
    }
    let mut featured = match req.sort {
        SortMode::Score => {
            let (featured, regular) = scoring::split_featured_at(&articles, &state.scoring, now);
            articles = regular;
            featured
        }
        SortMode::Recent => None,
    };

    // Only what is actually returned goes to the translator.
    let mut translation_mock = None;
    if req.translate {
        let has_featured = featured.is_some();
        let mut batch: Vec<NormalizedArticle> = featured.iter().cloned().collect();
        batch.extend(articles.iter().cloned());
        match state.translator.translate_articles(batch).await {
            Ok((mut translated, mock)) => {
                if has_featured {
                    featured = Some(translated.remove(0));
                }
                articles = translated;
                translation_mock = Some(mock);
            }
            Err(e) => tracing::warn!(error = %e, "translation failed; serving untranslated articles"),
        }
    }

    Ok(Json(ArticlesResponse {
        count: articles.len() + usize::from(featured.is_some()),
        articles,
        sources: served.sources,
        from_cache: served.from_cache,
        stale: served.stale.then_some(true),
        cached_at: served.cached_at,
        featured,
        translation_mock,
        failed_sources: served.failed_sources,
        tag_counts: counts,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    texts: Option<Vec<String>>,
}

async fn post_translate(
    State(state): State<AppState>,
    body: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslationOutcome>, CuratorError> {
    let Json(req) = body.map_err(|e| CuratorError::InvalidRequest(e.body_text()))?;
    let texts = req
        .texts
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CuratorError::InvalidRequest("texts must be a non-empty array".to_string()))?;
    let outcome = state.translator.translate_batch(&texts).await?;
    Ok(Json(outcome))
}
