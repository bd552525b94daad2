use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::{sync::Semaphore, task::JoinSet};
use url::Url;

use crate::error::CuratorError;
use crate::ingest::providers::ensure_success;
use crate::ingest::types::{FetchOptions, SourceAdapter};
use crate::ingest::{
    dedup_tags, from_epoch_secs, normalize_text, truncate_chars, DESCRIPTION_MAX_CHARS,
};
use crate::model::{NormalizedArticle, Source};

const DEFAULT_LIMIT: usize = 50;
const MAX_TAGS: usize = 5;
pub const DEFAULT_DESCRIPTION: &str = "No description available";
const DEFAULT_TAG: &str = "Tech News";

/// Title keyword -> tag. Matched against whole title tokens, lowercased.
const KEYWORD_TAGS: &[(&str, &str)] = &[
    ("rust", "Rust"),
    ("python", "Python"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("react", "React"),
    ("node.js", "Node.js"),
    ("nodejs", "Node.js"),
    ("go", "Go"),
    ("golang", "Go"),
    ("kubernetes", "Kubernetes"),
    ("k8s", "Kubernetes"),
    ("docker", "Docker"),
    ("ai", "AI"),
    ("ml", "Machine Learning"),
    ("llm", "LLM"),
    ("gpt", "AI"),
    ("openai", "AI"),
    ("claude", "AI"),
    ("anthropic", "AI"),
    ("startup", "Startup"),
    ("yc", "Y Combinator"),
    ("aws", "AWS"),
    ("linux", "Linux"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct HnItem {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub score: Option<u64>,
    #[serde(default)]
    pub descendants: Option<u64>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

pub struct HackerNewsAdapter {
    client: Client,
    base_url: String,
    concurrency: usize,
}

impl HackerNewsAdapter {
    pub fn new(client: Client, base_url: impl Into<String>, concurrency: usize) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            concurrency: concurrency.max(1),
        }
    }

    async fn top_story_ids(&self) -> Result<Vec<u64>, CuratorError> {
        let url = format!("{}/topstories.json", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CuratorError::from_reqwest(Source::HackerNews, e))?;
        ensure_success(Source::HackerNews, resp)
            .await?
            .json::<Vec<u64>>()
            .await
            .map_err(|e| CuratorError::from_reqwest(Source::HackerNews, e))
    }

    /// Detail fan-out, bounded by a semaphore. Failed items are dropped; rank order is kept.
    async fn fetch_items(&self, ids: &[u64]) -> Vec<HnItem> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();
        for (rank, id) in ids.iter().copied().enumerate() {
            let client = self.client.clone();
            let url = format!("{}/item/{id}.json", self.base_url);
            let permits = permits.clone();
            set.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                match fetch_item(&client, &url).await {
                    Ok(item) => item.map(|it| (rank, it)),
                    Err(e) => {
                        tracing::debug!(error = %e, id, "hn item dropped");
                        None
                    }
                }
            });
        }

        let mut items = Vec::with_capacity(ids.len());
        while let Some(joined) = set.join_next().await {
            if let Ok(Some(pair)) = joined {
                items.push(pair);
            }
        }
        items.sort_by_key(|(rank, _)| *rank);
        items.into_iter().map(|(_, it)| it).collect()
    }
}

/// `Ok(None)` for a `null` body (unknown id).
async fn fetch_item(client: &Client, url: &str) -> Result<Option<HnItem>, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Option<HnItem>>()
        .await
}

fn domain_tags(url: &str) -> Vec<&'static str> {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
        return Vec::new();
    };
    let on = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

    let mut tags = Vec::new();
    if on("github.com") {
        tags.push("GitHub");
    }
    if on("youtube.com") || on("youtu.be") {
        tags.push("Video");
    }
    if on("arxiv.org") {
        tags.push("Research");
    }
    tags
}

fn title_tokens(title: &str) -> Vec<String> {
    static RE_TOKEN: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_TOKEN.get_or_init(|| regex::Regex::new(r"[a-z0-9.+#]+").expect("static regex"));
    let lower = title.to_lowercase();
    re.find_iter(&lower)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Domain tags, then title keywords; deduplicated, capped, never empty.
pub fn extract_tags(title: &str, url: &str) -> Vec<String> {
    let tokens = title_tokens(title);
    let keyword_hits = KEYWORD_TAGS
        .iter()
        .filter(|(kw, _)| tokens.iter().any(|t| t == kw))
        .map(|(_, tag)| *tag);

    let tags = dedup_tags(
        domain_tags(url)
            .into_iter()
            .chain(keyword_hits)
            .map(String::from),
        MAX_TAGS,
    );
    if tags.is_empty() {
        vec![DEFAULT_TAG.to_string()]
    } else {
        tags
    }
}

/// `None` for deleted/dead items, items without a link, title or timestamp.
pub fn map_item(item: HnItem) -> Option<NormalizedArticle> {
    if item.deleted || item.dead {
        return None;
    }
    let url = item.url.filter(|u| !u.trim().is_empty())?;
    let title = item.title.filter(|t| !t.trim().is_empty())?;
    let published_at = item.time.and_then(from_epoch_secs)?;

    let description = item
        .text
        .as_deref()
        .map(normalize_text)
        .filter(|t| !t.is_empty())
        .map(|t| truncate_chars(&t, DESCRIPTION_MAX_CHARS, true))
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let tags = extract_tags(&title, &url);
    let mut a = NormalizedArticle::new(
        Source::HackerNews,
        format!("hn-{}", item.id),
        title,
        url,
        published_at,
    );
    a.description = description;
    a.tags = tags;
    a.author = item.by;
    a.score = item.score;
    a.comments_count = Some(item.descendants.unwrap_or(0));
    Some(a)
}

/// `tags`: case-insensitive exact, any of. Legacy `tag`: case-insensitive substring.
/// Then stable sort by score, highest first.
pub fn filter_and_sort(mut articles: Vec<NormalizedArticle>, opts: &FetchOptions) -> Vec<NormalizedArticle> {
    if !opts.tags.is_empty() {
        articles.retain(|a| crate::ingest::matches_any_tag_ignore_case(a, &opts.tags));
    } else if let Some(tag) = &opts.tag {
        let needle = tag.to_lowercase();
        articles.retain(|a| a.tags.iter().any(|t| t.to_lowercase().contains(&needle)));
    }
    articles.sort_by(|a, b| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0)));
    articles
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn source(&self) -> Source {
        Source::HackerNews
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<NormalizedArticle>, CuratorError> {
        let ids = self.top_story_ids().await?;
        let limit = options.limit_or(DEFAULT_LIMIT).min(ids.len());
        let items = self.fetch_items(&ids[..limit]).await;
        tracing::debug!(requested = limit, received = items.len(), "hn details fetched");

        let articles = items.into_iter().filter_map(map_item).collect();
        Ok(filter_and_sort(articles, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: serde_json::Value) -> HnItem {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn tags_from_domain_then_title() {
        assert_eq!(
            extract_tags("Show HN: A Rust LLM runtime", "https://github.com/x/y"),
            vec!["GitHub", "Rust", "LLM"]
        );
        assert_eq!(extract_tags("Talk", "https://youtu.be/abc"), vec!["Video"]);
        assert_eq!(
            extract_tags("Attention paper", "https://www.arxiv.org/abs/1"),
            vec!["Research"]
        );
    }

    #[test]
    fn keywords_match_whole_words_only() {
        // "going" and "email" must not produce Go or AI.
        assert_eq!(extract_tags("Going email-free", "https://blog.test"), vec!["Tech News"]);
        assert_eq!(extract_tags("Why Go?", "https://blog.test"), vec!["Go"]);
        assert_eq!(extract_tags("Node.js 22 released.", "https://n.test"), vec!["Node.js"]);
    }

    #[test]
    fn synonyms_collapse_and_cap_at_five() {
        let tags = extract_tags(
            "OpenAI GPT Claude AI Rust Python Docker AWS Linux",
            "https://github.com/a/b",
        );
        assert_eq!(tags, vec!["GitHub", "Rust", "Python", "Docker", "AI"]);
        assert_eq!(tags.len(), 5);
    }

    #[test]
    fn maps_story() {
        let a = map_item(item(json!({
            "id": 42, "type": "story", "by": "pg", "time": 1_700_000_000,
            "title": "Rust in production", "url": "https://example.com/rust",
            "score": 321, "text": "<p>It&#x27;s <i>fast</i></p>"
        })))
        .unwrap();
        assert_eq!(a.id, "hn-42");
        assert_eq!(a.published_at.timestamp(), 1_700_000_000);
        assert_eq!(a.description, "It's fast");
        assert_eq!(a.score, Some(321));
        assert_eq!(a.comments_count, Some(0));
        assert_eq!(a.author.as_deref(), Some("pg"));
        assert_eq!(a.tags, vec!["Rust"]);
    }

    #[test]
    fn drops_unlinked_and_dead_items() {
        assert!(map_item(item(json!({"id": 1, "title": "Ask HN", "time": 1}))).is_none());
        assert!(map_item(item(json!({
            "id": 2, "title": "x", "url": "https://x.test", "time": 1, "dead": true
        })))
        .is_none());
        let plain = map_item(item(json!({"id": 3, "title": "x", "url": "https://x.test", "time": 1}))).unwrap();
        assert_eq!(plain.description, DEFAULT_DESCRIPTION);
        // Missing score stays absent; missing descendants means no comments.
        assert_eq!(plain.score, None);
        assert_eq!(plain.comments_count, Some(0));
    }

    #[test]
    fn tag_options_and_score_sort() {
        let mk = |id: u64, title: &str, score: u64| {
            map_item(item(json!({
                "id": id, "title": title, "url": "https://x.test", "time": 1, "score": score
            })))
            .unwrap()
        };
        let list = vec![mk(1, "Rust news", 10), mk(2, "Docker tips", 50), mk(3, "Rust again", 30)];

        let exact = FetchOptions {
            tags: vec!["rust".into()],
            ..Default::default()
        };
        let ids: Vec<_> = filter_and_sort(list.clone(), &exact).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["hn-3", "hn-1"]);

        let substring = FetchOptions {
            tag: Some("ock".into()),
            ..Default::default()
        };
        let ids: Vec<_> = filter_and_sort(list.clone(), &substring).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["hn-2"]);

        let ids: Vec<_> = filter_and_sort(list, &FetchOptions::default()).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["hn-2", "hn-3", "hn-1"]);
    }
}
