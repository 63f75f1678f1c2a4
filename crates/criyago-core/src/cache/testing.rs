//! Test doubles for the cache manager's seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::storage::{CacheStorage, CachedResponse, MemoryStorage};
use super::{CacheError, Fetcher, Request, RequestKey, Response};

/// Serves canned responses by URL path; unknown paths get a 404.
#[derive(Default)]
pub struct StubFetcher {
    routes: HashMap<String, (u16, String)>,
    offline: bool,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch fails as if the network were down
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn route(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes.insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(CacheError::Network(format!("offline: {}", request.url)));
        }
        let (status, body) = self
            .routes
            .get(request.url.path())
            .cloned()
            .unwrap_or((404, String::new()));
        Ok(Response::new(request.url.as_str(), status, body))
    }
}

/// Memory storage that counts every call made against it, optionally
/// failing every `put` after the first `n`.
#[derive(Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    calls: AtomicUsize,
    puts: AtomicUsize,
    put_limit: Option<usize>,
}

impl CountingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after_puts(n: usize) -> Self {
        Self {
            put_limit: Some(n),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl CacheStorage for CountingStorage {
    fn open(&self, partition: &str) -> Result<bool, CacheError> {
        self.tick();
        self.inner.open(partition)
    }

    fn has(&self, partition: &str) -> Result<bool, CacheError> {
        self.tick();
        self.inner.has(partition)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.tick();
        self.inner.keys()
    }

    fn delete(&self, partition: &str) -> Result<bool, CacheError> {
        self.tick();
        self.inner.delete(partition)
    }

    fn put(&self, partition: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), CacheError> {
        self.tick();
        let done = self.puts.fetch_add(1, Ordering::SeqCst);
        if self.put_limit.is_some_and(|limit| done >= limit) {
            return Err(CacheError::Storage("disk full".to_string()));
        }
        self.inner.put(partition, key, entry)
    }

    fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>, CacheError> {
        self.tick();
        self.inner.lookup(partition, key)
    }

    fn entries(&self, partition: &str) -> Result<Vec<(RequestKey, CachedResponse)>, CacheError> {
        self.tick();
        self.inner.entries(partition)
    }
}
