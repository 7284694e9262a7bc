use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::model::VaultRef;
use crate::store::SecretStore;

type PendingFetch = Shared<BoxFuture<'static, Option<String>>>;

/// Secret values of the current vault, keyed by secret name.
///
/// `None` records a fetch that failed or was denied; it is served from the
/// cache like any other value. Concurrent lookups of the same uncached name
/// share one in-flight fetch.
#[derive(Default)]
pub struct SecretValueCache {
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    values: HashMap<String, Option<String>>,
    in_flight: HashMap<String, PendingFetch>,
    generation: u64,
}

impl SecretValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(
        &self,
        store: &Arc<dyn SecretStore>,
        vault: &VaultRef,
        name: &str,
    ) -> Option<String> {
        let (pending, generation) = {
            let mut state = self.state.lock().await;
            if let Some(value) = state.values.get(name) {
                debug!("value cache hit for '{}'", name);
                return value.clone();
            }
            let generation = state.generation;
            let pending = state
                .in_flight
                .entry(name.to_string())
                .or_insert_with(|| fetch(store.clone(), vault.clone(), name.to_string()))
                .clone();
            (pending, generation)
        };

        // await a clone: a completed `Shared` no longer compares equal to its siblings
        let value = pending.clone().await;

        // only the fetch still registered may store its answer: an invalidation
        // (other vault) or a `set` (newer value) while we waited supersedes it
        let mut state = self.state.lock().await;
        let current = state
            .in_flight
            .get(name)
            .is_some_and(|registered| registered.ptr_eq(&pending));
        if state.generation == generation && current {
            state.in_flight.remove(name);
            state.values.insert(name.to_string(), value.clone());
        }
        value
    }

    pub async fn set(&self, name: &str, value: String) {
        let mut state = self.state.lock().await;
        state.in_flight.remove(name);
        state.values.insert(name.to_string(), Some(value));
    }

    pub async fn forget(&self, name: &str) {
        self.state.lock().await.values.remove(name);
    }

    pub async fn invalidate_all(&self) {
        let mut state = self.state.lock().await;
        debug!("invalidating {} cached values", state.values.len());
        state.values.clear();
        state.in_flight.clear();
        state.generation += 1;
    }

    #[cfg(test)]
    pub async fn contains(&self, name: &str) -> bool {
        self.state.lock().await.values.contains_key(name)
    }
}

fn fetch(store: Arc<dyn SecretStore>, vault: VaultRef, name: String) -> PendingFetch {
    async move {
        debug!("fetching value of '{}' from '{}'", name, vault.name);
        match store.get_secret_value(&vault, &name).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to fetch value of '{}': {}", name, e);
                None
            }
        }
    }
    .boxed()
    .shared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, vault};

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new(vec![vault("alpha")])
                .with_secret("alpha", "db-password", Some("hunter2"))
                .with_secret("alpha", "empty", Some(""))
                .with_secret("alpha", "locked", None),
        )
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let memory = store();
        let store: Arc<dyn SecretStore> = memory.clone();
        let cache = SecretValueCache::new();
        let alpha = vault("alpha");

        let first = cache.get(&store, &alpha, "db-password").await;
        let second = cache.get(&store, &alpha, "db-password").await;

        assert_eq!(first.as_deref(), Some("hunter2"));
        assert_eq!(first, second);
        assert_eq!(memory.fetches(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_cached_as_none() {
        let memory = store();
        let store: Arc<dyn SecretStore> = memory.clone();
        let cache = SecretValueCache::new();
        let alpha = vault("alpha");

        assert_eq!(cache.get(&store, &alpha, "locked").await, None);
        assert_eq!(cache.get(&store, &alpha, "locked").await, None);
        assert_eq!(memory.fetches(), 1);

        // empty string is a real value, not a failure
        assert_eq!(cache.get(&store, &alpha, "empty").await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let memory = store();
        let store: Arc<dyn SecretStore> = memory.clone();
        let cache = SecretValueCache::new();
        let alpha = vault("alpha");

        let (a, b, c) = tokio::join!(
            cache.get(&store, &alpha, "db-password"),
            cache.get(&store, &alpha, "db-password"),
            cache.get(&store, &alpha, "db-password"),
        );

        assert_eq!(a.as_deref(), Some("hunter2"));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(memory.fetches(), 1);
    }

    #[tokio::test]
    async fn test_fetch_racing_invalidation_is_not_stored() {
        let memory = store();
        let store: Arc<dyn SecretStore> = memory.clone();
        let cache = SecretValueCache::new();
        let alpha = vault("alpha");

        let (value, ()) = tokio::join!(
            cache.get(&store, &alpha, "db-password"),
            cache.invalidate_all(),
        );

        // the caller still gets its answer, but the cache stays empty
        assert_eq!(value.as_deref(), Some("hunter2"));
        assert!(!cache.contains("db-password").await);
        assert_eq!(memory.fetches(), 1);
    }

    #[tokio::test]
    async fn test_set_during_fetch_is_not_overwritten() {
        let memory = store();
        let store: Arc<dyn SecretStore> = memory.clone();
        let cache = SecretValueCache::new();
        let alpha = vault("alpha");

        let (fetched, ()) = tokio::join!(
            cache.get(&store, &alpha, "db-password"),
            cache.set("db-password", "rotated".to_string()),
        );

        assert_eq!(fetched.as_deref(), Some("hunter2"));
        assert_eq!(
            cache.get(&store, &alpha, "db-password").await.as_deref(),
            Some("rotated")
        );
        assert_eq!(memory.fetches(), 1);
    }

    #[tokio::test]
    async fn test_set_seeds_and_invalidate_clears() {
        let memory = store();
        let store: Arc<dyn SecretStore> = memory.clone();
        let cache = SecretValueCache::new();
        let alpha = vault("alpha");

        cache.set("fresh", "bar".to_string()).await;
        assert_eq!(cache.get(&store, &alpha, "fresh").await.as_deref(), Some("bar"));
        assert_eq!(memory.fetches(), 0);

        cache.invalidate_all().await;
        assert!(!cache.contains("fresh").await);
    }
}
