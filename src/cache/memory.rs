use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::error::CuratorError;

/// In-process store with per-entry expiry. Expired entries are pruned on write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, exp)| *exp > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, CuratorError> {
        let now = Instant::now();
        let map = self.entries.read().await;
        Ok(map
            .get(key)
            .filter(|(_, exp)| *exp > now)
            .map(|(v, _)| v.clone()))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CuratorError> {
        let now = Instant::now();
        let mut map = self.entries.write().await;
        map.retain(|_, (_, exp)| *exp > now);
        map.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let store = MemoryStore::new();
        store.set_raw("k", "v", Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.get_raw("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.len().await, 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.get_raw("k").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = MemoryStore::new();
        store.set_raw("k", "1", Duration::from_secs(60)).await.unwrap();
        store.set_raw("k", "2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get_raw("k").await.unwrap().as_deref(), Some("2"));
    }
}
