//! Shared article model every source adapter normalizes into.
//!
//! Serialized with camelCase field names; optional metrics are omitted from JSON
//! when a source does not report them (absent is not the same as zero).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CuratorError;

/// Closed set of upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Qiita,
    HackerNews,
    GitHub,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Qiita, Source::HackerNews, Source::GitHub];

    /// Wire name, also used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Qiita => "qiita",
            Source::HackerNews => "hackernews",
            Source::GitHub => "github",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Qiita => "Qiita",
            Source::HackerNews => "HN",
            Source::GitHub => "GitHub",
        }
    }

    /// Sources whose content is not written in the reader's language.
    pub fn needs_translation(&self) -> bool {
        matches!(self, Source::HackerNews)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qiita" => Ok(Source::Qiita),
            "hackernews" | "hn" => Ok(Source::HackerNews),
            "github" | "gh" => Ok(Source::GitHub),
            other => Err(CuratorError::InvalidRequest(format!(
                "unknown source '{other}'"
            ))),
        }
    }
}

/// The canonical unit served to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    // Qiita
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stocks_count: Option<u64>,

    // Hacker News
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments_count: Option<u64>,

    // GitHub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    // Translation overlay, written only by the translation service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_ja: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_ja: Option<String>,
    #[serde(default)]
    pub is_translated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time_minutes: Option<u32>,
}

impl NormalizedArticle {
    /// Minimal article; adapters fill in the source-specific fields afterwards.
    pub fn new(
        source: Source,
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            url: url.into(),
            published_at,
            source,
            author: None,
            image_url: None,
            tags: Vec::new(),
            likes_count: None,
            stocks_count: None,
            score: None,
            comments_count: None,
            stars: None,
            forks: None,
            language: None,
            title_ja: None,
            description_ja: None,
            is_translated: false,
            reading_time_minutes: None,
        }
    }

    /// Identity used for dedup and featured-exclusion.
    pub fn identity(&self) -> (Source, &str) {
        (self.source, self.id.as_str())
    }

    pub fn has_tag_ignore_case(&self, wanted: &str) -> bool {
        let wanted = wanted.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn source_parses_aliases_and_rejects_unknown() {
        assert_eq!("Qiita".parse::<Source>().unwrap(), Source::Qiita);
        assert_eq!(" hn ".parse::<Source>().unwrap(), Source::HackerNews);
        assert_eq!("GITHUB".parse::<Source>().unwrap(), Source::GitHub);
        assert!("reddit".parse::<Source>().is_err());
    }

    #[test]
    fn absent_metrics_are_omitted_but_zero_is_kept() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut a = NormalizedArticle::new(Source::HackerNews, "hn-1", "t", "https://x.test", ts);
        a.score = Some(0);

        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["score"], 0);
        assert!(v.get("likesCount").is_none());
        assert_eq!(v["source"], "hackernews");
        assert_eq!(v["publishedAt"], "2024-01-01T00:00:00Z");

        let back: NormalizedArticle = serde_json::from_value(v).unwrap();
        assert_eq!(back, a);
    }
}
