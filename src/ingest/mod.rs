// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};
use tokio::task::JoinSet;

use crate::error::CuratorError;
use crate::ingest::types::{FetchOptions, SourceAdapter};
use crate::model::{NormalizedArticle, Source};

pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_articles_fetched_total",
            "Articles returned by source adapters."
        );
        describe_counter!(
            "feed_source_errors_total",
            "Adapter failures and timeouts, by source."
        );
        describe_histogram!("feed_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_histogram!("feed_parse_ms", "Upstream payload mapping time in milliseconds.");
    });
}

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Plain text from an HTML fragment: decode entities, drop tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    // Tags first, so an encoded "&lt;b&gt;" in the text survives as literal "<b>".
    let out = re(&RE_TAGS, r"(?is)</?[a-z][^>]*>").replace_all(s, " ");
    let out = html_escape::decode_html_entities(&out);
    let out = re(&RE_WS, r"\s+").replace_all(&out, " ");
    out.trim().to_string()
}

/// Markdown body to a single-line plain-text summary. Heading lines are dropped.
pub fn strip_markdown(md: &str) -> String {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    static RE_IMAGE: OnceCell<Regex> = OnceCell::new();
    static RE_LINK: OnceCell<Regex> = OnceCell::new();
    static RE_INLINE: OnceCell<Regex> = OnceCell::new();
    static RE_HTML: OnceCell<Regex> = OnceCell::new();
    static RE_HEADING: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    let out = re(&RE_HEADING, r"(?m)^#+[ \t]+.*$").replace_all(md, "");
    let out = re(&RE_FENCE, r"(?s)```.*?```").replace_all(&out, " ");
    let out = re(&RE_IMAGE, r"!\[[^\]]*\]\([^)]*\)").replace_all(&out, "");
    let out = re(&RE_LINK, r"\[([^\]]*)\]\([^)]*\)").replace_all(&out, "$1");
    let out = re(&RE_INLINE, r"`([^`]*)`").replace_all(&out, "$1");
    let out = re(&RE_HTML, r"(?s)<[^>]+>").replace_all(&out, "");
    let out = re(&RE_WS, r"\s+").replace_all(&out, " ");
    out.trim().to_string()
}

/// Cut to `max` chars; appends `...` only when something was actually cut.
pub fn truncate_chars(s: &str, max: usize, ellipsis: bool) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((byte_idx, _)) => {
            let mut out = s[..byte_idx].to_string();
            if ellipsis {
                out.push_str("...");
            }
            out
        }
    }
}

/// Drop repeated tags (case-sensitive, first wins) and cap the count.
pub fn dedup_tags<I>(tags: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .take(cap)
        .collect()
}

/// First occurrence of each `(source, id)` wins.
pub fn dedupe_by_identity(articles: Vec<NormalizedArticle>) -> Vec<NormalizedArticle> {
    let mut seen: HashSet<(Source, String)> = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert((a.source, a.id.clone())))
        .collect()
}

pub fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// RFC 3339 (any offset) or RFC 2822, normalized to UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    OffsetDateTime::parse(s, &Rfc2822)
        .ok()
        .and_then(|dt| from_epoch_secs(dt.unix_timestamp()))
}

/// Case-insensitive "article has any of these tags".
pub fn matches_any_tag_ignore_case(a: &NormalizedArticle, wanted: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| a.has_tag_ignore_case(w))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: Source,
    pub message: String,
}

/// Merged result of one orchestrator run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub articles: Vec<NormalizedArticle>,
    pub source_counts: BTreeMap<Source, usize>,
    pub failures: Vec<SourceFailure>,
}

impl FetchOutcome {
    /// True only when every requested source failed.
    pub fn all_failed(&self) -> bool {
        self.source_counts.is_empty() && !self.failures.is_empty()
    }

    pub fn failed_sources(&self) -> Vec<Source> {
        self.failures.iter().map(|f| f.source).collect()
    }

    pub fn into_error(self) -> CuratorError {
        CuratorError::AllSourcesFailed(
            self.failures
                .into_iter()
                .map(|f| format!("{}: {}", f.source, f.message))
                .collect(),
        )
    }
}

/// Runs the registered adapters concurrently and merges what succeeds.
#[derive(Clone)]
pub struct Orchestrator {
    adapters: BTreeMap<Source, Arc<dyn SourceAdapter>>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, timeout: Duration) -> Self {
        let adapters = adapters.into_iter().map(|a| (a.source(), a)).collect();
        Self { adapters, timeout }
    }

    pub fn sources(&self) -> Vec<Source> {
        self.adapters.keys().copied().collect()
    }

    /// Fetch from `sources` (all registered when empty). A failing or slow source
    /// contributes nothing but never aborts the others.
    pub async fn fetch_all(&self, sources: &[Source], options: &FetchOptions) -> FetchOutcome {
        ensure_metrics_described();

        let requested: Vec<Source> = if sources.is_empty() {
            self.sources()
        } else {
            let mut v = sources.to_vec();
            v.sort();
            v.dedup();
            v
        };

        let mut outcome = FetchOutcome::default();
        let mut set = JoinSet::new();
        for source in &requested {
            let Some(adapter) = self.adapters.get(source).cloned() else {
                outcome.failures.push(SourceFailure {
                    source: *source,
                    message: "no adapter registered".to_string(),
                });
                continue;
            };
            let opts = options.clone();
            let timeout = self.timeout;
            set.spawn(async move {
                let source = adapter.source();
                let t0 = Instant::now();
                let res = match tokio::time::timeout(timeout, adapter.fetch(&opts)).await {
                    Ok(r) => r,
                    Err(_) => Err(CuratorError::source_unavailable(
                        source,
                        format!("timed out after {}s", timeout.as_secs_f32()),
                    )),
                };
                let ms = t0.elapsed().as_secs_f64() * 1_000.0;
                histogram!("feed_fetch_ms", "source" => source.as_str()).record(ms);
                (source, res)
            });
        }

        let mut per_source: HashMap<Source, Vec<NormalizedArticle>> = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((source, Ok(list))) => {
                    tracing::debug!(source = source.as_str(), count = list.len(), "source fetched");
                    counter!("feed_articles_fetched_total", "source" => source.as_str())
                        .increment(list.len() as u64);
                    per_source.insert(source, list);
                }
                Ok((source, Err(e))) => {
                    tracing::warn!(error = %e, source = source.as_str(), "source error");
                    counter!("feed_source_errors_total", "source" => source.as_str())
                        .increment(1);
                    outcome.failures.push(SourceFailure {
                        source,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "adapter task failed");
                }
            }
        }

        // A panicked task never reports back; count it as failed.
        for source in &requested {
            let reported = per_source.contains_key(source)
                || outcome.failures.iter().any(|f| f.source == *source);
            if !reported {
                counter!("feed_source_errors_total", "source" => source.as_str()).increment(1);
                outcome.failures.push(SourceFailure {
                    source: *source,
                    message: "adapter task aborted".to_string(),
                });
            }
        }
        outcome.failures.sort_by_key(|f| f.source);

        // Concatenate in source order so equal timestamps stay deterministic.
        let mut merged = Vec::new();
        for source in &requested {
            if let Some(list) = per_source.remove(source) {
                outcome.source_counts.insert(*source, list.len());
                merged.extend(list);
            }
        }
        let mut merged = dedupe_by_identity(merged);
        merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        outcome.articles = merged;
        outcome
    }
}
