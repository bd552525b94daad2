// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::analyze::scoring::ScoringConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/curator.toml";
pub const ENV_CONFIG_PATH: &str = "NEWS_CURATOR_CONFIG";

pub const USER_AGENT: &str = "news-curator/0.1";

/// Whole-application configuration. Every section falls back to defaults, so an
/// empty (or missing) TOML file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub articles: ArticlesConfig,
    pub endpoints: Endpoints,
    pub scoring: ScoringConfig,
    pub translation: TranslationConfig,
    pub cache: CacheConfig,
    /// Secrets are read from the environment only, never from the file.
    #[serde(skip)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticlesConfig {
    pub cache_ttl_secs: u64,
    /// How long an expired article list is kept around for the stale fallback.
    pub stale_retention_secs: u64,
    pub per_source_limit: usize,
    pub days: u32,
    pub fetch_timeout_secs: u64,
    pub hn_detail_concurrency: usize,
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30 * 60,
            stale_retention_secs: 7 * 24 * 3600,
            per_source_limit: 50,
            days: 7,
            fetch_timeout_secs: 10,
            hn_detail_concurrency: 16,
        }
    }
}

impl ArticlesConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.stale_retention_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub qiita_api: String,
    pub hacker_news_api: String,
    pub github_api: String,
    pub google_translate_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            qiita_api: "https://qiita.com/api/v2".to_string(),
            hacker_news_api: "https://hacker-news.firebaseio.com/v0".to_string(),
            github_api: "https://api.github.com".to_string(),
            google_translate_api: "https://translation.googleapis.com/language/translate/v2"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub cache_ttl_secs: u64,
    pub batch_size: usize,
    pub source_lang: String,
    pub target_lang: String,
    pub mock_prefix: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30 * 24 * 3600,
            batch_size: 20,
            source_lang: "en".to_string(),
            target_lang: "ja".to_string(),
            mock_prefix: "[翻訳] ".to_string(),
        }
    }
}

impl TranslationConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Upstash when credentials are present, in-memory otherwise.
    #[default]
    Auto,
    Upstash,
    Memory,
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisCredentials {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub google_translate_api_key: Option<String>,
    pub github_token: Option<String>,
    pub qiita_access_token: Option<String>,
    pub redis: Option<RedisCredentials>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Resolve credentials through an arbitrary lookup (env, map in tests).
    /// Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // Vercel KV names take precedence over plain Upstash names.
        let url = get("KV_REST_API_URL").or_else(|| get("UPSTASH_REDIS_REST_URL"));
        let token = get("KV_REST_API_TOKEN").or_else(|| get("UPSTASH_REDIS_REST_TOKEN"));
        let redis = match (url, token) {
            (Some(url), Some(token)) => Some(RedisCredentials { url, token }),
            _ => None,
        };

        Self {
            google_translate_api_key: get("GOOGLE_TRANSLATE_API_KEY"),
            github_token: get("GITHUB_TOKEN"),
            qiita_access_token: get("QIITA_ACCESS_TOKEN"),
            redis,
        }
    }
}

impl AppConfig {
    /// Load a config file (TOML) without touching credentials.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then attach credentials from the environment:
    /// 1) $NEWS_CURATOR_CONFIG (must exist)
    /// 2) config/curator.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from_file(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.credentials = Credentials::from_env();
        Ok(cfg)
    }

    /// Replace nonsensical values with defaults instead of failing at startup.
    pub fn sanitize(&mut self) {
        let d = ArticlesConfig::default();
        let a = &mut self.articles;
        if a.cache_ttl_secs == 0 {
            a.cache_ttl_secs = d.cache_ttl_secs;
        }
        if a.per_source_limit == 0 {
            a.per_source_limit = d.per_source_limit;
        }
        a.per_source_limit = a.per_source_limit.min(100);
        if a.days == 0 {
            a.days = d.days;
        }
        if a.fetch_timeout_secs == 0 {
            a.fetch_timeout_secs = d.fetch_timeout_secs;
        }
        if a.hn_detail_concurrency == 0 {
            a.hn_detail_concurrency = d.hn_detail_concurrency;
        }

        let t = &mut self.translation;
        let td = TranslationConfig::default();
        if t.cache_ttl_secs == 0 {
            t.cache_ttl_secs = td.cache_ttl_secs;
        }
        // Google Translate v2 accepts at most 128 segments per request.
        t.batch_size = match t.batch_size {
            0 => td.batch_size,
            n => n.min(128),
        };

        self.scoring.sanitize();
    }
}
