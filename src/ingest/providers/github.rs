use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::CuratorError;
use crate::ingest::providers::ensure_success;
use crate::ingest::types::{FetchOptions, SourceAdapter};
use crate::ingest::{
    dedup_tags, matches_any_tag_ignore_case, parse_timestamp, truncate_chars,
    DESCRIPTION_MAX_CHARS,
};
use crate::model::{NormalizedArticle, Source};

const DEFAULT_LIMIT: usize = 50;
const DEFAULT_DAYS: u32 = 7;
const MIN_STARS: u32 = 100;
const MAX_TOPICS: usize = 4;
const MAX_TAGS: usize = 5;
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<GitHubRepo>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: Owner,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub pushed_at: String,
}

#[derive(Debug, Deserialize)]
pub struct Owner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

pub struct GitHubAdapter {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubAdapter {
    pub fn new(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }
}

pub fn build_url(base: &str, opts: &FetchOptions, now: DateTime<Utc>) -> Result<Url, CuratorError> {
    let mut url = Url::parse(&format!("{}/search/repositories", base.trim_end_matches('/')))
        .map_err(|e| CuratorError::source_unavailable(Source::GitHub, format!("bad base url: {e}")))?;

    let mut q = Vec::new();
    match opts.requested_tags().as_slice() {
        [] => {}
        [one] => q.push(format!("language:{one}")),
        many => {
            let group: Vec<String> = many.iter().map(|t| format!("language:{t}")).collect();
            q.push(format!("({})", group.join(" ")));
        }
    }
    q.push(format!("stars:>{MIN_STARS}"));
    let since = now - Duration::days(i64::from(opts.days.unwrap_or(DEFAULT_DAYS)));
    q.push(format!("pushed:>{}", since.format("%Y-%m-%d")));

    url.query_pairs_mut()
        .append_pair("q", &q.join(" "))
        .append_pair("sort", "stars")
        .append_pair("order", "desc")
        .append_pair("per_page", &opts.limit_or(DEFAULT_LIMIT).to_string());
    Ok(url)
}

pub fn map_repo(repo: GitHubRepo) -> Option<NormalizedArticle> {
    let published_at = parse_timestamp(&repo.pushed_at)?;
    if repo.html_url.trim().is_empty() {
        return None;
    }

    let tags = dedup_tags(
        repo.language
            .iter()
            .cloned()
            .chain(repo.topics.into_iter().take(MAX_TOPICS)),
        MAX_TAGS,
    );

    let mut a = NormalizedArticle::new(
        Source::GitHub,
        format!("gh-{}", repo.id),
        repo.full_name,
        repo.html_url,
        published_at,
    );
    a.description = repo
        .description
        .as_deref()
        .map(|d| truncate_chars(d, DESCRIPTION_MAX_CHARS, false))
        .unwrap_or_default();
    a.tags = tags;
    a.stars = Some(repo.stargazers_count);
    a.forks = Some(repo.forks_count);
    a.language = repo.language;
    a.author = Some(repo.owner.login);
    a.image_url = repo.owner.avatar_url;
    Some(a)
}

#[async_trait]
impl SourceAdapter for GitHubAdapter {
    fn source(&self) -> Source {
        Source::GitHub
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<NormalizedArticle>, CuratorError> {
        let url = build_url(&self.base_url, options, Utc::now())?;
        let mut req = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CuratorError::from_reqwest(Source::GitHub, e))?;
        let body: SearchResponse = ensure_success(Source::GitHub, resp)
            .await?
            .json()
            .await
            .map_err(|e| CuratorError::from_reqwest(Source::GitHub, e))?;

        let wanted = options.requested_tags();
        Ok(body
            .items
            .into_iter()
            .filter_map(map_repo)
            .filter(|a| matches_any_tag_ignore_case(a, &wanted))
            .collect())
    }
}
