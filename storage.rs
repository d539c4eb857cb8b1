use crate::*;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Persisted cache storage: named caches surviving restarts of the execution
/// context. Futures are not `Send` because the execution model is a
/// single-threaded event loop (and the browser handles are not `Send` either).
#[async_trait(?Send)]
pub trait Caches {
    type Cache: Cache;
    async fn open(&self, name: &str) -> Result<Self::Cache>;
    async fn list(&self) -> Result<Vec<String>>;
    /// Returns whether a cache with that name existed.
    async fn delete(&self, name: &str) -> Result<bool>;
}

/// A single named cache of request -> response snapshots. Writes to the same
/// key are last-write-wins; no locking is provided or required.
#[async_trait(?Send)]
pub trait Cache {
    /// Owned duplicate of the stored response, if any.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>>;
    async fn put(&self, request: Request, response: Response) -> Result<()>;
}

/// The network collaborator. Consumes the request; a failed fetch surfaces as
/// an error, an HTTP error status is still a successful fetch.
#[async_trait(?Send)]
pub trait Network {
    async fn fetch(&self, request: Request) -> Result<Response>;
}

// outer map stays ordered so list() is deterministic
type Store = BTreeMap<String, HashMap<CacheKey, Response>>;

/// In-memory [`Caches`] implementation. Backs the native tests and works as a
/// drop-in fake for downstream ones; clones share the same underlying store,
/// so several controller versions can see the same "persisted" state.
#[derive(Default, Clone)]
pub struct MemoryCaches {
    store: Rc<RefCell<Store>>,
}

impl MemoryCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cache that pretends to have survived from an older deployment.
    pub fn seed(&self, name: &str) {
        self.store.borrow_mut().entry(name.to_owned()).or_default();
    }

    pub fn contains(&self, name: &str, key: &CacheKey) -> bool {
        self.store
            .borrow()
            .get(name)
            .is_some_and(|cache| cache.contains_key(key))
    }

    pub fn entry_count(&self, name: &str) -> usize {
        self.store.borrow().get(name).map_or(0, |cache| cache.len())
    }
}

pub struct MemoryCache {
    name: String,
    store: Rc<RefCell<Store>>,
}

#[async_trait(?Send)]
impl Caches for MemoryCaches {
    type Cache = MemoryCache;

    async fn open(&self, name: &str) -> Result<MemoryCache> {
        // open() creates the cache if it is absent, like the browser API
        self.store.borrow_mut().entry(name.to_owned()).or_default();
        Ok(MemoryCache {
            name: name.to_owned(),
            store: self.store.clone(),
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.store.borrow().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.store.borrow_mut().remove(name).is_some())
    }
}

#[async_trait(?Send)]
impl Cache for MemoryCache {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>> {
        let store = self.store.borrow();
        let Some(cache) = store.get(&self.name) else {
            return Err(Error::storage(format!("cache {} was deleted", self.name)));
        };
        Ok(cache.get(key).map(Response::duplicate))
    }

    async fn put(&self, request: Request, response: Response) -> Result<()> {
        let mut store = self.store.borrow_mut();
        let Some(cache) = store.get_mut(&self.name) else {
            return Err(Error::storage(format!("cache {} was deleted", self.name)));
        };
        cache.insert(request.key(), response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_lookup_roundtrip() {
        let caches = MemoryCaches::new();
        let cache = caches.open("window-cache-v1").await.unwrap();

        let request = Request::get("./static/styles/site.css");
        let key = request.key();
        assert!(cache.lookup(&key).await.unwrap().is_none());

        cache.put(request, Response::ok("a { color: blue }")).await.unwrap();
        let stored = cache.lookup(&key).await.unwrap().unwrap();
        assert_eq!(stored.status(), StatusCode::OK);
        assert_eq!(stored.body(), "a { color: blue }".as_bytes());
    }

    #[tokio::test]
    async fn same_key_is_last_write_wins() {
        let caches = MemoryCaches::new();
        let cache = caches.open("window-cache-v1").await.unwrap();
        let request = Request::get("./");
        let key = request.key();

        cache.put(request.duplicate(), Response::ok("first")).await.unwrap();
        cache.put(request, Response::ok("second")).await.unwrap();
        let stored = cache.lookup(&key).await.unwrap().unwrap();
        assert_eq!(stored.body(), "second".as_bytes());
    }

    #[tokio::test]
    async fn delete_reports_whether_cache_existed() {
        let caches = MemoryCaches::new();
        caches.open("window-cache-v1").await.unwrap();
        assert!(caches.delete("window-cache-v1").await.unwrap());
        assert!(!caches.delete("window-cache-v1").await.unwrap());
        assert!(caches.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_persisted_state() {
        let caches = MemoryCaches::new();
        let other = caches.clone();
        caches.seed("window-cache-v2");
        assert_eq!(other.list().await.unwrap(), vec!["window-cache-v2"]);
    }
}
