//! In-memory filtering over a fetched article collection. Pure, no I/O.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::analyze::category::{tags_for_categories, Category};
use crate::model::{NormalizedArticle, Source};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    And,
    #[default]
    Or,
}

impl std::str::FromStr for TagMode {
    type Err = crate::error::CuratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(TagMode::And),
            "or" => Ok(TagMode::Or),
            other => Err(crate::error::CuratorError::InvalidRequest(format!(
                "tagMode must be 'and' or 'or', got '{other}'"
            ))),
        }
    }
}

/// Query-time predicate; empty sets and a blank keyword are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    pub selected_sources: HashSet<Source>,
    pub selected_tags: HashSet<String>,
    pub search_keyword: String,
    pub tag_mode: TagMode,
    pub selected_categories: HashSet<Category>,
    /// Compare tags case-insensitively, as the feed's own tag filter does.
    pub tags_ignore_case: bool,
}

impl FilterPredicate {
    pub fn is_empty(&self) -> bool {
        self.selected_sources.is_empty()
            && self.selected_tags.is_empty()
            && self.search_keyword.trim().is_empty()
            && self.selected_categories.is_empty()
    }
}

fn matches_tags(a: &NormalizedArticle, pred: &FilterPredicate) -> bool {
    let has = |t: &String| {
        if pred.tags_ignore_case {
            a.has_tag_ignore_case(t)
        } else {
            a.tags.contains(t)
        }
    };
    match pred.tag_mode {
        TagMode::And => pred.selected_tags.iter().all(has),
        TagMode::Or => pred.selected_tags.iter().any(has),
    }
}

fn matches_keyword(a: &NormalizedArticle, needle: &str) -> bool {
    a.title.to_lowercase().contains(needle)
        || a.description.to_lowercase().contains(needle)
        || a.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Keep the articles every active predicate accepts, in input order.
pub fn filter_articles(
    articles: &[NormalizedArticle],
    pred: &FilterPredicate,
) -> Vec<NormalizedArticle> {
    let needle = pred.search_keyword.trim().to_lowercase();
    let category_tags = tags_for_categories(&pred.selected_categories);

    articles
        .iter()
        .filter(|a| pred.selected_sources.is_empty() || pred.selected_sources.contains(&a.source))
        .filter(|a| pred.selected_tags.is_empty() || matches_tags(a, pred))
        .filter(|a| needle.is_empty() || matches_keyword(a, &needle))
        .filter(|a| {
            category_tags.is_empty()
                || a.tags
                    .iter()
                    .any(|t| category_tags.contains(t.to_lowercase().as_str()))
        })
        .cloned()
        .collect()
}

/// Tag frequencies, most common first, ties by name.
pub fn tag_counts(articles: &[NormalizedArticle]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in articles.iter().flat_map(|a| a.tags.iter()) {
        *counts.entry(t.as_str()).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(t, n)| (t.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}
