//! Item cache coordinator.
//!
//! Reads are cache-aside: consult the substrate, fall back to the store on a
//! miss and populate the entry. Writes go to the store first and are then
//! mirrored unconditionally: update overwrites the entry, delete removes it.
//! The store call and the cache call are two independent steps with no lock
//! between them, so concurrent writers on one id resolve last-writer-wins on
//! the cache just as they do on the store.
//!
//! Substrate failures never fail a request. They are logged, counted, and the
//! operation continues against the store alone.

use std::sync::Arc;

use metrics::counter;
use stockroom_api_types::ItemView;
use tracing::{info, warn};

use crate::application::repos::{ItemsRepo, RepoError};
use crate::domain::items::ItemDraft;

use super::keys::item_key;
use super::store::{CacheError, CacheStore};

const TARGET: &str = "stockroom::cache::items";

#[derive(Clone)]
pub struct ItemCacheCoordinator {
    items: Arc<dyn ItemsRepo>,
    cache: Arc<dyn CacheStore>,
}

impl ItemCacheCoordinator {
    pub fn new(items: Arc<dyn ItemsRepo>, cache: Arc<dyn CacheStore>) -> Self {
        Self { items, cache }
    }

    pub async fn get(&self, id: i64) -> Result<ItemView, RepoError> {
        let key = item_key(id);

        let cache_usable = match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<ItemView>(&raw) {
                Ok(view) => {
                    counter!("stockroom_item_cache_hit_total").increment(1);
                    info!(target: TARGET, item_id = id, "Item retrieved from cache");
                    return Ok(view);
                }
                Err(err) => {
                    // Unreadable entry: treat as a miss and let the store value replace it.
                    self.degraded("decode", &key, &CacheError::Codec(err.to_string()));
                    true
                }
            },
            Ok(None) => true,
            Err(err) => {
                self.degraded("get", &key, &err);
                false
            }
        };

        counter!("stockroom_item_cache_miss_total").increment(1);

        let item = self.items.find_item(id).await?.ok_or(RepoError::NotFound)?;
        let view = item.to_view();

        if cache_usable && self.write(&key, &view).await {
            info!(target: TARGET, item_id = id, "Item retrieved from store and cached");
        } else {
            info!(target: TARGET, item_id = id, "Item retrieved from store");
        }

        Ok(view)
    }

    /// Full replacement. The entry is overwritten, not invalidated, so the
    /// next read is a hit on the new state.
    pub async fn update(&self, id: i64, draft: &ItemDraft) -> Result<ItemView, RepoError> {
        let item = self.items.update_item(id, draft).await?;
        let view = item.to_view();

        let key = item_key(id);
        if self.write(&key, &view).await {
            info!(target: TARGET, item_id = id, name = %item.name, "Item updated and cache refreshed");
        } else {
            info!(target: TARGET, item_id = id, name = %item.name, "Item updated");
        }

        Ok(view)
    }

    pub async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.items.delete_item(id).await?;

        let key = item_key(id);
        match self.cache.delete(&key).await {
            Ok(()) => {
                counter!("stockroom_item_cache_invalidate_total").increment(1);
                info!(target: TARGET, item_id = id, "Item deleted and cache invalidated");
            }
            Err(err) => {
                self.degraded("delete", &key, &err);
                info!(target: TARGET, item_id = id, "Item deleted");
            }
        }

        Ok(())
    }

    /// Returns whether the entry was written.
    async fn write(&self, key: &str, view: &ItemView) -> bool {
        let encoded = match serde_json::to_string(view) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.degraded("encode", key, &CacheError::Codec(err.to_string()));
                return false;
            }
        };

        match self.cache.set(key, encoded).await {
            Ok(()) => {
                counter!("stockroom_item_cache_write_total").increment(1);
                true
            }
            Err(err) => {
                self.degraded("set", key, &err);
                false
            }
        }
    }

    fn degraded(&self, op: &'static str, key: &str, err: &CacheError) {
        counter!("stockroom_item_cache_error_total", "op" => op).increment(1);
        warn!(
            target: TARGET,
            op,
            key,
            backend = self.cache.backend(),
            error = %err,
            "Cache substrate failure; continuing with the store only"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use stockroom_api_types::ItemWriteRequest;

    use super::*;
    use crate::cache::{CacheConfig, CacheError, MemoryCacheStore};
    use crate::domain::items::{Item, Price};

    #[derive(Default)]
    struct SingleItemRepo {
        item: Mutex<Option<Item>>,
        finds: AtomicUsize,
    }

    #[async_trait]
    impl ItemsRepo for SingleItemRepo {
        async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
            Ok(self.item.lock().unwrap().iter().cloned().collect())
        }

        async fn create_item(&self, _draft: &ItemDraft) -> Result<Item, RepoError> {
            unreachable!("coordinator never creates")
        }

        async fn find_item(&self, id: i64) -> Result<Option<Item>, RepoError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            Ok(self.item.lock().unwrap().clone().filter(|item| item.id == id))
        }

        async fn update_item(&self, id: i64, draft: &ItemDraft) -> Result<Item, RepoError> {
            let mut slot = self.item.lock().unwrap();
            match slot.as_mut() {
                Some(item) if item.id == id => {
                    item.name = draft.name.clone();
                    item.description = draft.description.clone();
                    item.quantity = draft.quantity;
                    item.price = draft.price;
                    Ok(item.clone())
                }
                _ => Err(RepoError::NotFound),
            }
        }

        async fn delete_item(&self, id: i64) -> Result<(), RepoError> {
            let mut slot = self.item.lock().unwrap();
            match slot.as_ref() {
                Some(item) if item.id == id => {
                    *slot = None;
                    Ok(())
                }
                _ => Err(RepoError::NotFound),
            }
        }
    }

    fn seeded() -> (Arc<SingleItemRepo>, Arc<MemoryCacheStore>, ItemCacheCoordinator) {
        let repo = Arc::new(SingleItemRepo::default());
        *repo.item.lock().unwrap() = Some(Item {
            id: 1,
            name: "Bolt".into(),
            description: String::new(),
            quantity: 0,
            price: Price::parse("9.5").unwrap(),
        });
        let cache = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let coordinator = ItemCacheCoordinator::new(repo.clone(), cache.clone());
        (repo, cache, coordinator)
    }

    fn draft(value: serde_json::Value) -> ItemDraft {
        let request: ItemWriteRequest = serde_json::from_value(value).unwrap();
        ItemDraft::validate(&request).unwrap()
    }

    #[tokio::test]
    async fn second_get_is_served_from_cache() {
        let (repo, cache, coordinator) = seeded();

        let first = coordinator.get(1).await.expect("first get");
        assert!(cache.contains("item_1"));
        let second = coordinator.get(1).await.expect("second get");

        assert_eq!(first, second);
        assert_eq!(first.price, "9.50");
        assert_eq!(repo.finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_item_is_not_cached() {
        let (_repo, cache, coordinator) = seeded();

        let err = coordinator.get(2).await.expect_err("absent");
        assert!(matches!(err, RepoError::NotFound));
        assert!(!cache.contains("item_2"));
    }

    #[tokio::test]
    async fn corrupt_entry_is_replaced_from_store() {
        let (repo, cache, coordinator) = seeded();
        cache.set("item_1", "{not json".into()).await.unwrap();

        let view = coordinator.get(1).await.expect("fallback");
        assert_eq!(view.name, "Bolt");
        assert_eq!(repo.finds.load(Ordering::SeqCst), 1);

        coordinator.get(1).await.expect("now cached");
        assert_eq!(repo.finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn update_overwrites_existing_entry() {
        let (repo, _cache, coordinator) = seeded();
        coordinator.get(1).await.expect("warm");

        let updated = coordinator
            .update(1, &draft(json!({"name": "Bolt", "price": 19.0, "description": "steel"})))
            .await
            .expect("update");
        assert_eq!(updated.price, "19.00");

        let read = coordinator.get(1).await.expect("read after update");
        assert_eq!(read, updated);
        assert_eq!(repo.finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_update_leaves_cache_untouched() {
        let (_repo, cache, coordinator) = seeded();

        let err = coordinator
            .update(9, &draft(json!({"name": "Nut", "price": 1})))
            .await
            .expect_err("absent id");
        assert!(matches!(err, RepoError::NotFound));
        assert!(!cache.contains("item_9"));
    }

    #[tokio::test]
    async fn delete_removes_entry_and_row() {
        let (_repo, cache, coordinator) = seeded();
        coordinator.get(1).await.expect("warm");

        coordinator.delete(1).await.expect("delete");
        assert!(!cache.contains("item_1"));
        assert!(matches!(coordinator.get(1).await, Err(RepoError::NotFound)));
        assert!(matches!(coordinator.delete(1).await, Err(RepoError::NotFound)));
    }

    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        fn backend(&self) -> &'static str {
            "down"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn write_logs_only_claim_cache_effects_that_happened() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (repo, _cache, _coordinator) = seeded();
        let coordinator = ItemCacheCoordinator::new(repo, Arc::new(DownStore));

        coordinator
            .update(1, &draft(json!({"name": "Bolt", "price": 2})))
            .await
            .expect("update despite outage");
        coordinator.delete(1).await.expect("delete despite outage");

        let logs = buffer.contents();
        assert!(logs.contains("Item updated"));
        assert!(logs.contains("Item deleted"));
        assert!(!logs.contains("cache refreshed"), "{logs}");
        assert!(!logs.contains("cache invalidated"), "{logs}");
    }
}
