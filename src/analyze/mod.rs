// src/analyze/mod.rs
//! Ranking and filtering over normalized articles.

pub mod category;
pub mod filter;
pub mod scoring;

pub use category::{tags_for_categories, Category};
pub use filter::{filter_articles, tag_counts, FilterPredicate, TagMode};
pub use scoring::{
    get_featured_at, score, score_at, sort_by_score_at, split_featured_at, ScoreBreakdown,
    ScoringConfig,
};
