use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cache::CacheStore;
use crate::error::CuratorError;

/// Redis over the Upstash REST API. Commands are posted as JSON arrays to the base URL.
pub struct UpstashStore {
    client: Client,
    url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(client: Client, url: &str, token: &str) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn command(&self, cmd: Value) -> Result<Option<Value>, CuratorError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&cmd)
            .send()
            .await
            .map_err(|e| CuratorError::CacheUnavailable(format!("upstash transport: {e}")))?;
        let status = resp.status();
        let reply: Reply = resp
            .json()
            .await
            .map_err(|e| CuratorError::CacheUnavailable(format!("upstash decode ({status}): {e}")))?;
        if let Some(err) = reply.error {
            return Err(CuratorError::CacheUnavailable(format!("upstash ({status}): {err}")));
        }
        if !status.is_success() {
            return Err(CuratorError::CacheUnavailable(format!("upstash: HTTP {status}")));
        }
        Ok(reply.result.filter(|v| !v.is_null()))
    }
}

#[async_trait]
impl CacheStore for UpstashStore {
    fn backend(&self) -> &'static str {
        "upstash"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, CuratorError> {
        match self.command(json!(["GET", key])).await? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Ok(Some(other.to_string())),
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CuratorError> {
        let secs = ttl.as_secs().max(1);
        self.command(json!(["SET", key, value, "EX", secs])).await?;
        Ok(())
    }
}
