// src/ingest/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CuratorError;
use crate::model::{NormalizedArticle, Source};

/// Client-side ordering some sources apply after fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Created,
    Likes,
    Stocks,
}

/// Per-request knobs shared by every adapter. Unset fields use adapter defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Legacy single tag. Hacker News matches it as a substring.
    pub tag: Option<String>,
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    pub days: Option<u32>,
    pub sort_by: Option<SortBy>,
}

impl FetchOptions {
    /// `tags` when given, otherwise the single legacy `tag`.
    pub fn requested_tags(&self) -> Vec<String> {
        if !self.tags.is_empty() {
            self.tags.clone()
        } else {
            self.tag.iter().cloned().collect()
        }
    }

    /// Same options with every tag restriction removed.
    pub fn without_tags(&self) -> Self {
        Self {
            tag: None,
            tags: Vec::new(),
            ..self.clone()
        }
    }

    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, 100)
    }
}

/// One upstream article source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<NormalizedArticle>, CuratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_win_over_legacy_tag() {
        let o = FetchOptions {
            tag: Some("go".into()),
            tags: vec!["rust".into()],
            ..Default::default()
        };
        assert_eq!(o.requested_tags(), vec!["rust"]);
        let legacy = FetchOptions {
            tag: Some("go".into()),
            ..Default::default()
        };
        assert_eq!(legacy.requested_tags(), vec!["go"]);
        assert!(legacy.without_tags().requested_tags().is_empty());
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(FetchOptions::default().limit_or(50), 50);
        let big = FetchOptions {
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(big.limit_or(50), 100);
        let zero = FetchOptions {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.limit_or(50), 1);
    }
}
