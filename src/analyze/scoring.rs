//! Article scoring and ranking.
//!
//! Score = w_stocks*stocks + w_likes*likes + w_recency*recency, every sub-score
//! clamped to [0, MAX]:
//! - `stocks`  : stocksCount / stocks_divisor (0 when absent)
//! - `likes`   : likesCount / likes_divisor; sources without likes use their
//!               closest analog (HN score, GitHub stars)
//! - `recency` : MAX - hours_since_published * decay_per_hour

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::NormalizedArticle;

/// Tunable scoring constants. Defaults are the product-tuned values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub stocks_divisor: f64,
    pub likes_divisor: f64,
    pub w_stocks: f64,
    pub w_likes: f64,
    pub w_recency: f64,
    /// Points lost per hour since publication.
    pub recency_decay_per_hour: f64,
    pub max_sub_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            stocks_divisor: 3.0,
            likes_divisor: 5.0,
            w_stocks: 0.40,
            w_likes: 0.35,
            w_recency: 0.25,
            recency_decay_per_hour: 2.0,
            max_sub_score: 100.0,
        }
    }
}

impl ScoringConfig {
    /// Non-positive divisors/caps and negative weights fall back to defaults.
    pub fn sanitize(&mut self) {
        let d = Self::default();
        fn fix(v: &mut f64, default: f64, ok: fn(f64) -> bool) {
            if !v.is_finite() || !ok(*v) {
                *v = default;
            }
        }
        fix(&mut self.stocks_divisor, d.stocks_divisor, |x| x > 0.0);
        fix(&mut self.likes_divisor, d.likes_divisor, |x| x > 0.0);
        fix(&mut self.max_sub_score, d.max_sub_score, |x| x > 0.0);
        fix(&mut self.w_stocks, d.w_stocks, |x| x >= 0.0);
        fix(&mut self.w_likes, d.w_likes, |x| x >= 0.0);
        fix(&mut self.w_recency, d.w_recency, |x| x >= 0.0);
        fix(&mut self.recency_decay_per_hour, d.recency_decay_per_hour, |x| x >= 0.0);
    }
}

/// Per-article breakdown, handy for debugging rankings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub stocks: f64,
    pub likes: f64,
    pub recency: f64,
    pub total: f64,
}

/// Likes, or the closest engagement analog the source reports.
fn likes_signal(a: &NormalizedArticle) -> Option<u64> {
    a.likes_count.or(a.score).or(a.stars)
}

pub fn breakdown_at(a: &NormalizedArticle, cfg: &ScoringConfig, now: DateTime<Utc>) -> ScoreBreakdown {
    let max = cfg.max_sub_score;
    let clamp = |x: f64| x.clamp(0.0, max);

    let stocks = clamp(a.stocks_count.unwrap_or(0) as f64 / cfg.stocks_divisor);
    let likes = clamp(likes_signal(a).unwrap_or(0) as f64 / cfg.likes_divisor);

    let hours = (now - a.published_at).num_milliseconds() as f64 / 3_600_000.0;
    let recency = clamp(max - hours * cfg.recency_decay_per_hour);

    let total = stocks * cfg.w_stocks + likes * cfg.w_likes + recency * cfg.w_recency;
    ScoreBreakdown {
        stocks,
        likes,
        recency,
        total,
    }
}

pub fn score_at(a: &NormalizedArticle, cfg: &ScoringConfig, now: DateTime<Utc>) -> f64 {
    breakdown_at(a, cfg, now).total
}

/// Score against the wall clock with default constants.
pub fn score(a: &NormalizedArticle) -> f64 {
    score_at(a, &ScoringConfig::default(), Utc::now())
}

/// Highest-scoring article; the earliest one wins a tie. `None` for empty input.
pub fn get_featured_at<'a>(
    articles: &'a [NormalizedArticle],
    cfg: &ScoringConfig,
    now: DateTime<Utc>,
) -> Option<&'a NormalizedArticle> {
    let mut best: Option<(&NormalizedArticle, f64)> = None;
    for a in articles {
        let s = score_at(a, cfg, now);
        match best {
            Some((_, bs)) if s <= bs => {}
            _ => best = Some((a, s)),
        }
    }
    best.map(|(a, _)| a)
}

/// Full list descending by score. Stable: equal scores keep input order.
pub fn sort_by_score_at(
    articles: &[NormalizedArticle],
    cfg: &ScoringConfig,
    now: DateTime<Utc>,
) -> Vec<NormalizedArticle> {
    let mut scored: Vec<(f64, &NormalizedArticle)> =
        articles.iter().map(|a| (score_at(a, cfg, now), a)).collect();
    scored.sort_by(|x, y| y.0.total_cmp(&x.0));
    scored.into_iter().map(|(_, a)| a.clone()).collect()
}

/// Featured pick plus the ranked remainder. The remainder excludes the featured
/// article by identity, so duplicates elsewhere in the list stay put.
pub fn split_featured_at(
    articles: &[NormalizedArticle],
    cfg: &ScoringConfig,
    now: DateTime<Utc>,
) -> (Option<NormalizedArticle>, Vec<NormalizedArticle>) {
    let featured = get_featured_at(articles, cfg, now).cloned();
    let ranked = sort_by_score_at(articles, cfg, now);
    let regular = match &featured {
        Some(f) => ranked
            .into_iter()
            .filter(|a| a.identity() != f.identity())
            .collect(),
        None => ranked,
    };
    (featured, regular)
}
