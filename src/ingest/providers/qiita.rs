use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::histogram;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::CuratorError;
use crate::ingest::providers::ensure_success;
use crate::ingest::types::{FetchOptions, SortBy, SourceAdapter};
use crate::ingest::{
    matches_any_tag_ignore_case, parse_timestamp, strip_markdown, truncate_chars,
    DESCRIPTION_MAX_CHARS,
};
use crate::model::{NormalizedArticle, Source};

const DEFAULT_LIMIT: usize = 50;
/// Minimum engagement filter pushed into the search query.
const MIN_STOCKS: u32 = 5;

#[derive(Debug, Deserialize)]
pub struct QiitaItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub url: String,
    pub created_at: String,
    #[serde(default)]
    pub likes_count: Option<u64>,
    #[serde(default)]
    pub stocks_count: Option<u64>,
    #[serde(default)]
    pub tags: Vec<QiitaTag>,
    #[serde(default)]
    pub user: Option<QiitaUser>,
}

#[derive(Debug, Deserialize)]
pub struct QiitaTag {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct QiitaUser {
    pub id: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

pub struct QiitaAdapter {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl QiitaAdapter {
    pub fn new(client: Client, base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token,
        }
    }
}

/// `{base}/items?page=1&per_page=N&query=...`
pub fn build_url(base: &str, opts: &FetchOptions, now: DateTime<Utc>) -> Result<Url, CuratorError> {
    let mut url = Url::parse(&format!("{}/items", base.trim_end_matches('/')))
        .map_err(|e| CuratorError::source_unavailable(Source::Qiita, format!("bad base url: {e}")))?;

    let mut query = Vec::new();
    if let [tag] = opts.requested_tags().as_slice() {
        query.push(format!("tag:{tag}"));
    }
    if let Some(days) = opts.days {
        let since = now - Duration::days(i64::from(days));
        query.push(format!("created:>={}", since.format("%Y-%m-%d")));
    }
    query.push(format!("stocks:>{MIN_STOCKS}"));

    url.query_pairs_mut()
        .append_pair("page", "1")
        .append_pair("per_page", &opts.limit_or(DEFAULT_LIMIT).to_string())
        .append_pair("query", &query.join(" "));
    Ok(url)
}

/// `None` when the creation date cannot be parsed.
pub fn map_item(item: QiitaItem) -> Option<NormalizedArticle> {
    let published_at = match parse_timestamp(&item.created_at) {
        Some(ts) => ts,
        None => {
            tracing::debug!(id = %item.id, created_at = %item.created_at, "qiita: unparseable date");
            return None;
        }
    };
    if item.url.trim().is_empty() {
        return None;
    }

    let mut a = NormalizedArticle::new(Source::Qiita, item.id, item.title, item.url, published_at);
    a.description = item
        .body
        .as_deref()
        .map(strip_markdown)
        .map(|s| truncate_chars(&s, DESCRIPTION_MAX_CHARS, true))
        .unwrap_or_default();
    a.tags = crate::ingest::dedup_tags(item.tags.into_iter().map(|t| t.name), usize::MAX);
    a.likes_count = item.likes_count;
    a.stocks_count = item.stocks_count;
    if let Some(user) = item.user {
        a.author = Some(user.id);
        a.image_url = user.profile_image_url;
    }
    Some(a)
}

/// Stable, descending.
pub fn sort_articles(articles: &mut [NormalizedArticle], sort_by: Option<SortBy>) {
    match sort_by {
        None => {}
        Some(SortBy::Created) => articles.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        Some(SortBy::Likes) => {
            articles.sort_by(|a, b| b.likes_count.unwrap_or(0).cmp(&a.likes_count.unwrap_or(0)))
        }
        Some(SortBy::Stocks) => articles
            .sort_by(|a, b| b.stocks_count.unwrap_or(0).cmp(&a.stocks_count.unwrap_or(0))),
    }
}

/// Map a raw `/items` payload. Anything but a JSON array is an upstream error.
pub fn parse_items(body: serde_json::Value) -> Result<Vec<NormalizedArticle>, CuratorError> {
    if !body.is_array() {
        return Err(CuratorError::source_unavailable(
            Source::Qiita,
            "unexpected response: not an array",
        ));
    }
    let items: Vec<QiitaItem> = serde_json::from_value(body)
        .map_err(|e| CuratorError::source_unavailable(Source::Qiita, format!("decode: {e}")))?;
    Ok(items.into_iter().filter_map(map_item).collect())
}

#[async_trait]
impl SourceAdapter for QiitaAdapter {
    fn source(&self) -> Source {
        Source::Qiita
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<NormalizedArticle>, CuratorError> {
        let url = build_url(&self.base_url, options, Utc::now())?;
        let mut req = self.client.get(url);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CuratorError::from_reqwest(Source::Qiita, e))?;
        let resp = ensure_success(Source::Qiita, resp).await?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CuratorError::from_reqwest(Source::Qiita, e))?;

        let t0 = std::time::Instant::now();
        let mut articles = parse_items(body)?;
        let wanted = options.requested_tags();
        if wanted.len() > 1 {
            articles.retain(|a| matches_any_tag_ignore_case(a, &wanted));
        }
        sort_articles(&mut articles, options.sort_by);
        histogram!("feed_parse_ms", "source" => "qiita").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
    }

    fn query_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(k, _)| k == "query")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn url_carries_tag_date_and_engagement_clauses() {
        let opts = FetchOptions {
            tag: Some("Rust".into()),
            limit: Some(20),
            days: Some(7),
            ..Default::default()
        };
        let url = build_url("https://qiita.com/api/v2/", &opts, now()).unwrap();
        assert_eq!(url.path(), "/api/v2/items");
        assert_eq!(query_of(&url), "tag:Rust created:>=2025-03-03 stocks:>5");
        assert!(url.query().unwrap().contains("per_page=20"));
        assert!(url.query().unwrap().contains("page=1"));
    }

    #[test]
    fn multiple_tags_skip_server_clause() {
        let opts = FetchOptions {
            tags: vec!["Rust".into(), "Go".into()],
            ..Default::default()
        };
        let url = build_url("https://qiita.com/api/v2", &opts, now()).unwrap();
        assert_eq!(query_of(&url), "stocks:>5");
        assert!(url.query().unwrap().contains("per_page=50"));
    }

    #[test]
    fn maps_item_fields() {
        let long_body = format!("## Intro\n\n{}", "a".repeat(300));
        let body = json!([{
            "id": "abc123",
            "title": "Rust入門",
            "body": long_body,
            "url": "https://qiita.com/u/items/abc123",
            "created_at": "2025-03-01T09:00:00+09:00",
            "likes_count": 12,
            "stocks_count": 0,
            "tags": [{"name": "Rust"}, {"name": "Rust"}, {"name": "初心者"}],
            "user": {"id": "ferris", "profile_image_url": "https://img.test/f.png"}
        }]);
        let out = parse_items(body).unwrap();
        assert_eq!(out.len(), 1);
        let a = &out[0];
        assert_eq!(a.id, "abc123");
        assert_eq!(a.published_at, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(a.description.chars().count(), 203);
        assert!(a.description.ends_with("..."));
        assert_eq!(a.tags, vec!["Rust", "初心者"]);
        assert_eq!(a.likes_count, Some(12));
        assert_eq!(a.stocks_count, Some(0));
        assert_eq!(a.author.as_deref(), Some("ferris"));
        assert!(a.score.is_none());
    }

    #[test]
    fn short_body_has_no_ellipsis_and_bad_dates_drop() {
        let body = json!([
            {"id": "1", "title": "t", "body": "short", "url": "https://q/1", "created_at": "2025-03-01T00:00:00Z"},
            {"id": "2", "title": "t", "url": "https://q/2", "created_at": "not a date"}
        ]);
        let out = parse_items(body).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description, "short");
    }

    #[test]
    fn non_array_is_an_error() {
        let err = parse_items(json!({"message": "rate limited"})).unwrap_err();
        assert!(matches!(err, CuratorError::SourceUnavailable { origin: Source::Qiita, .. }));
    }

    #[test]
    fn client_sort_is_stable_and_descending() {
        let mk = |id: &str, likes: u64| {
            let mut a = NormalizedArticle::new(Source::Qiita, id, id, "https://q", now());
            a.likes_count = Some(likes);
            a
        };
        let mut v = vec![mk("a", 1), mk("b", 9), mk("c", 1), mk("d", 9)];
        sort_articles(&mut v, Some(SortBy::Likes));
        let ids: Vec<_> = v.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }
}
