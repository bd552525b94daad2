// src/translate/mod.rs
//! Batch translation with a per-text cache and a mock fallback.

pub mod articles;
pub mod provider;

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;

use crate::cache::{CacheStore, TRANSLATION_PREFIX};
use crate::config::TranslationConfig;
use crate::error::CuratorError;

pub use provider::{GoogleTranslator, TranslationProvider};

pub const TRANSLATION_SCHEMA_VERSION: u32 = 1;
const KEY_TEXT_CHARS: usize = 50;

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("translation_cache_hits_total", "Texts answered from the translation cache.");
        describe_counter!("translation_cache_misses_total", "Texts that needed a translation.");
        describe_counter!("translation_mock_total", "Texts answered with a mock translation.");
        describe_counter!("translation_provider_calls_total", "Batched provider requests.");
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    pub schema_version: u32,
    pub text: String,
    pub mock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationOutcome {
    pub translations: Vec<String>,
    /// Every text came from the cache.
    pub cached: bool,
    /// At least one translation is a mock placeholder.
    pub mock: bool,
}

/// `cache:translation:<first 50 chars, [^a-z0-9] -> _>_<char length>_<8 hex of sha256>`,
/// computed over the trimmed, lowercased text.
pub fn translation_key(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    let readable: String = normalized
        .chars()
        .take(KEY_TEXT_CHARS)
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .collect();
    let digest = Sha256::digest(normalized.as_bytes());
    let short: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!(
        "{TRANSLATION_PREFIX}{readable}_{}_{short}",
        normalized.chars().count()
    )
}

#[derive(Clone)]
pub struct Translator {
    store: Arc<dyn CacheStore>,
    provider: Option<Arc<dyn TranslationProvider>>,
    cfg: TranslationConfig,
}

impl Translator {
    /// `provider = None` selects the mock fallback.
    pub fn new(
        store: Arc<dyn CacheStore>,
        provider: Option<Arc<dyn TranslationProvider>>,
        cfg: TranslationConfig,
    ) -> Self {
        Self {
            store,
            provider,
            cfg,
        }
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.cfg
    }

    pub fn mock_translation(&self, text: &str) -> String {
        format!("{}{}", self.cfg.mock_prefix, text)
    }

    /// Concurrent lookups for distinct keys. Store errors count as misses.
    async fn lookup(&self, keys: &[String]) -> HashMap<String, TranslationEntry> {
        let mut set = JoinSet::new();
        for key in keys {
            let store = self.store.clone();
            let key = key.clone();
            set.spawn(async move {
                let raw = match store.get_raw(&key).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::warn!(error = %e, key = %key, "translation cache read failed");
                        None
                    }
                };
                let entry = raw.and_then(|r| serde_json::from_str::<TranslationEntry>(&r).ok());
                (key, entry)
            });
        }

        let mut found = HashMap::new();
        while let Some(joined) = set.join_next().await {
            if let Ok((key, Some(entry))) = joined {
                found.insert(key, entry);
            }
        }
        found
    }

    async fn remember(&self, key: &str, text: &str, mock: bool) {
        let entry = TranslationEntry {
            schema_version: TRANSLATION_SCHEMA_VERSION,
            text: text.to_string(),
            mock,
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "translation entry unserializable");
                return;
            }
        };
        if let Err(e) = self.store.set_raw(key, &raw, self.cfg.cache_ttl()).await {
            tracing::warn!(error = %e, key, "translation cache write failed");
        }
    }

    /// Translate `texts`, preserving order and length.
    pub async fn translate_batch(&self, texts: &[String]) -> Result<TranslationOutcome, CuratorError> {
        ensure_metrics_described();
        if texts.is_empty() {
            return Err(CuratorError::InvalidRequest(
                "texts must be a non-empty array".to_string(),
            ));
        }

        let keys: Vec<String> = texts.iter().map(|t| translation_key(t)).collect();
        let mut unique_keys = keys.clone();
        unique_keys.sort();
        unique_keys.dedup();
        let found = self.lookup(&unique_keys).await;

        let usable = |e: &TranslationEntry| {
            e.schema_version == TRANSLATION_SCHEMA_VERSION && !(e.mock && self.provider.is_some())
        };

        let mut results: Vec<Option<String>> = vec![None; texts.len()];
        let mut mock = false;
        // Misses in first-seen order; identical texts share one slot.
        let mut missed: Vec<(String, String)> = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            match found.get(key).filter(|e| usable(e)) {
                Some(entry) => {
                    mock |= entry.mock;
                    results[i] = Some(entry.text.clone());
                }
                None => {
                    if !missed.iter().any(|(k, _)| k == key) {
                        missed.push((key.clone(), texts[i].clone()));
                    }
                }
            }
        }
        let hits = results.iter().filter(|r| r.is_some()).count();
        counter!("translation_cache_hits_total").increment(hits as u64);
        counter!("translation_cache_misses_total").increment((texts.len() - hits) as u64);

        if missed.is_empty() {
            return Ok(TranslationOutcome {
                translations: results.into_iter().flatten().collect(),
                cached: true,
                mock,
            });
        }

        let fresh: HashMap<String, String> = match &self.provider {
            None => {
                counter!("translation_mock_total").increment(missed.len() as u64);
                let mut out = HashMap::new();
                for (key, text) in &missed {
                    let value = self.mock_translation(text);
                    self.remember(key, &value, true).await;
                    out.insert(key.clone(), value);
                }
                mock = true;
                out
            }
            Some(provider) => {
                let inputs: Vec<String> = missed.iter().map(|(_, t)| t.clone()).collect();
                counter!("translation_provider_calls_total").increment(1);
                let translated = provider
                    .translate(&inputs, &self.cfg.source_lang, &self.cfg.target_lang)
                    .await
                    .map_err(|e| {
                        tracing::warn!(error = %e, provider = provider.name(), count = inputs.len(), "translation failed");
                        e
                    })?;
                if translated.len() != inputs.len() {
                    return Err(CuratorError::TranslationProvider {
                        status: None,
                        message: format!(
                            "expected {} translations, got {}",
                            inputs.len(),
                            translated.len()
                        ),
                    });
                }
                let mut out = HashMap::new();
                for ((key, _), value) in missed.iter().zip(translated) {
                    self.remember(key, &value, false).await;
                    out.insert(key.clone(), value);
                }
                out
            }
        };

        let translations = results
            .into_iter()
            .zip(&keys)
            .map(|(r, key)| r.or_else(|| fresh.get(key).cloned()).unwrap_or_default())
            .collect();
        Ok(TranslationOutcome {
            translations,
            cached: false,
            mock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    #[test]
    fn key_shape() {
        let k = translation_key("  Hello, World!  ");
        assert!(k.starts_with("cache:translation:hello__world__13_"), "{k}");
        assert_eq!(k.rsplit('_').next().unwrap().len(), 8);
        assert_eq!(translation_key("hello, world!"), k);
        assert_ne!(translation_key("Hello, World?"), k);
    }

    #[test]
    fn key_truncates_long_text() {
        let k = translation_key(&"a".repeat(120));
        let body = k.trim_start_matches(TRANSLATION_PREFIX);
        assert!(body.starts_with(&format!("{}_120_", "a".repeat(50))));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let t = Translator::new(Arc::new(MemoryStore::new()), None, TranslationConfig::default());
        let err = t.translate_batch(&[]).await.unwrap_err();
        assert!(matches!(err, CuratorError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn mock_then_cached() {
        let t = Translator::new(Arc::new(MemoryStore::new()), None, TranslationConfig::default());
        let texts = vec!["Hello".to_string(), "World".to_string()];

        let first = t.translate_batch(&texts).await.unwrap();
        assert_eq!(first.translations, vec!["[翻訳] Hello", "[翻訳] World"]);
        assert!(first.mock);
        assert!(!first.cached);

        let second = t.translate_batch(&texts).await.unwrap();
        assert_eq!(second.translations, first.translations);
        assert!(second.cached);
        assert!(second.mock, "cached mock values stay flagged");
    }
}
