//! Machine translation backends.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::CuratorError;

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Translate `texts` in one call. Output order and length must match the input.
    async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, CuratorError>;
}

/// Google Cloud Translation v2 (`POST {endpoint}?key=...`).
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct GoogleRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Deserialize)]
struct GoogleData {
    #[serde(default)]
    translations: Vec<GoogleTranslation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
}

impl GoogleTranslator {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

fn provider_error(status: Option<u16>, message: impl Into<String>) -> CuratorError {
    CuratorError::TranslationProvider {
        status,
        message: message.into(),
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslator {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn translate(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, CuratorError> {
        let body = GoogleRequest {
            q: texts,
            source: source_lang,
            target: target_lang,
            format: "text",
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_error(None, e.to_string()))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| provider_error(Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_str::<GoogleErrorBody>(&raw)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
            return Err(provider_error(Some(status.as_u16()), message));
        }

        let parsed: GoogleResponse = serde_json::from_str(&raw)
            .map_err(|e| provider_error(Some(status.as_u16()), format!("decode: {e}")))?;
        Ok(parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect())
    }
}
