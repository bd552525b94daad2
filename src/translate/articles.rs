//! Title/description translation overlay for non-native sources.

use crate::error::CuratorError;
use crate::ingest::providers::hackernews::DEFAULT_DESCRIPTION;
use crate::model::NormalizedArticle;
use crate::translate::Translator;

/// Where each text in the flat batch goes back to.
enum Slot {
    Title(usize),
    Description(usize),
}

fn wants_description(a: &NormalizedArticle) -> bool {
    !a.description.trim().is_empty() && a.description != DEFAULT_DESCRIPTION
}

impl Translator {
    /// Fill `title_ja`/`description_ja` on articles whose source needs translation
    /// and that are not translated yet. Returns the articles and whether any
    /// translation was a mock.
    pub async fn translate_articles(
        &self,
        mut articles: Vec<NormalizedArticle>,
    ) -> Result<(Vec<NormalizedArticle>, bool), CuratorError> {
        let mut slots = Vec::new();
        let mut texts = Vec::new();
        for (i, a) in articles.iter().enumerate() {
            if !a.source.needs_translation() || a.is_translated {
                continue;
            }
            slots.push(Slot::Title(i));
            texts.push(a.title.clone());
            if wants_description(a) {
                slots.push(Slot::Description(i));
                texts.push(a.description.clone());
            }
        }
        if texts.is_empty() {
            return Ok((articles, false));
        }

        let mut translated = Vec::with_capacity(texts.len());
        let mut mock = false;
        for chunk in texts.chunks(self.config().batch_size.max(1)) {
            let out = self.translate_batch(chunk).await?;
            mock |= out.mock;
            translated.extend(out.translations);
        }

        for (slot, text) in slots.into_iter().zip(translated) {
            match slot {
                Slot::Title(i) => {
                    let a = &mut articles[i];
                    a.title_ja = Some(text);
                    a.is_translated = true;
                    if !wants_description(a) {
                        a.description_ja = Some(a.description.clone());
                    }
                }
                Slot::Description(i) => articles[i].description_ja = Some(text),
            }
        }
        tracing::debug!(count = articles.iter().filter(|a| a.is_translated).count(), mock, "articles translated");
        Ok((articles, mock))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::cache::MemoryStore;
    use crate::config::TranslationConfig;
    use crate::model::{NormalizedArticle, Source};
    use crate::translate::Translator;

    use super::DEFAULT_DESCRIPTION;

    fn art(source: Source, id: &str, title: &str, desc: &str) -> NormalizedArticle {
        let mut a = NormalizedArticle::new(source, id, title, "https://x.test", Utc::now());
        a.description = desc.to_string();
        a
    }

    #[tokio::test]
    async fn only_untranslated_hn_articles_change() {
        let cfg = TranslationConfig {
            batch_size: 1,
            ..Default::default()
        };
        let t = Translator::new(Arc::new(MemoryStore::new()), None, cfg);

        let mut done = art(Source::HackerNews, "hn-3", "Done", "");
        done.is_translated = true;
        done.title_ja = Some("済".into());
        let input = vec![
            art(Source::HackerNews, "hn-1", "Rust 2.0", "Big release"),
            art(Source::HackerNews, "hn-2", "Ask", DEFAULT_DESCRIPTION),
            art(Source::Qiita, "q-1", "日本語", "本文"),
            done.clone(),
        ];
        let (out, mock) = t.translate_articles(input).await.unwrap();
        assert!(mock);

        assert_eq!(out[0].title_ja.as_deref(), Some("[翻訳] Rust 2.0"));
        assert_eq!(out[0].description_ja.as_deref(), Some("[翻訳] Big release"));
        assert!(out[0].is_translated);

        assert_eq!(out[1].title_ja.as_deref(), Some("[翻訳] Ask"));
        assert_eq!(out[1].description_ja.as_deref(), Some(DEFAULT_DESCRIPTION));

        assert!(out[2].title_ja.is_none());
        assert!(!out[2].is_translated);
        assert_eq!(out[3], done);
    }

    #[tokio::test]
    async fn nothing_to_translate_is_not_an_error() {
        let t = Translator::new(Arc::new(MemoryStore::new()), None, TranslationConfig::default());
        let (out, mock) = t
            .translate_articles(vec![art(Source::GitHub, "gh-1", "repo", "")])
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(!mock);
    }
}
