// tests/common/mod.rs
// Fakes shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use news_curator::cache::{CacheStore, MemoryStore};
use news_curator::error::CuratorError;
use news_curator::ingest::types::{FetchOptions, SourceAdapter};
use news_curator::model::{NormalizedArticle, Source};
use news_curator::translate::TranslationProvider;

pub fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
}

pub fn article(source: Source, id: &str, hour: u32, tags: &[&str]) -> NormalizedArticle {
    let mut a = NormalizedArticle::new(
        source,
        id,
        format!("title {id}"),
        format!("https://example.test/{id}"),
        ts(hour),
    );
    a.tags = tags.iter().map(|t| t.to_string()).collect();
    a
}

/// Adapter returning a canned result; can be flipped to failing and slowed down.
pub struct FakeAdapter {
    source: Source,
    articles: Mutex<Vec<NormalizedArticle>>,
    failing: Mutex<bool>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeAdapter {
    pub fn ok(source: Source, articles: Vec<NormalizedArticle>) -> Arc<Self> {
        Arc::new(Self {
            source,
            articles: Mutex::new(articles),
            failing: Mutex::new(false),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(source: Source) -> Arc<Self> {
        let a = Self::ok(source, Vec::new());
        a.set_failing(true);
        a
    }

    pub fn slow(source: Source, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            source,
            articles: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn set_articles(&self, articles: Vec<NormalizedArticle>) {
        *self.articles.lock().unwrap() = articles;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, _options: &FetchOptions) -> Result<Vec<NormalizedArticle>, CuratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if *self.failing.lock().unwrap() {
            return Err(CuratorError::SourceUnavailable {
                origin: self.source,
                status: Some(500),
                message: "boom".into(),
            });
        }
        Ok(self.articles.lock().unwrap().clone())
    }
}

/// Memory store that counts writes and can be made to fail.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub writes: AtomicUsize,
    pub broken: Mutex<bool>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    fn backend(&self) -> &'static str {
        "counting"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, CuratorError> {
        if *self.broken.lock().unwrap() {
            return Err(CuratorError::CacheUnavailable("broken".into()));
        }
        self.inner.get_raw(key).await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CuratorError> {
        if *self.broken.lock().unwrap() {
            return Err(CuratorError::CacheUnavailable("broken".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_raw(key, value, ttl).await
    }
}

/// Translation provider that upper-cases its input, or fails on demand.
#[derive(Default)]
pub struct FakeTranslator {
    pub calls: AtomicUsize,
    pub last_batch: Mutex<Vec<String>>,
    pub fail: bool,
    pub drop_one: bool,
}

#[async_trait]
impl TranslationProvider for FakeTranslator {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn translate(
        &self,
        texts: &[String],
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<Vec<String>, CuratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_batch.lock().unwrap() = texts.to_vec();
        if self.fail {
            return Err(CuratorError::TranslationProvider {
                status: Some(403),
                message: "quota exceeded".into(),
            });
        }
        let mut out: Vec<String> = texts.iter().map(|t| format!("JA:{}", t.to_uppercase())).collect();
        if self.drop_one {
            out.pop();
        }
        Ok(out)
    }
}
