//! Caching decorator for operations.
//!
//! Request and response shapes are stored under
//! `service:operationId:request:<security>` and `service:operationId:response`,
//! where `<security>` fingerprints the security schemes the request was built
//! with. Lookups and writes are not
//! coalesced: concurrent misses for the same key both compute, and the last
//! write wins. Shapes are deterministic for a fixed operation, so either
//! value is correct.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use crate::document::{Operation, OperationRequest, OperationResponse, SecurityComponents};
use crate::types::ParseConfig;

/// A cached operation shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Request(OperationRequest),
    Response(OperationResponse),
}

/// Storage behind [`CacheOperationAdapter`].
pub trait CacheStorage: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn set(&self, key: &str, entry: CacheEntry);
}

/// In-process storage guarded by a single lock.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), entry);
            }
            Err(_) => tracing::warn!(key, "cache lock poisoned, entry not stored"),
        }
    }
}

/// Wraps an [`Operation`], caching its request and response shapes.
#[derive(Debug)]
pub struct CacheOperationAdapter {
    service: String,
    inner: Box<dyn Operation>,
    storage: Arc<dyn CacheStorage>,
}

impl CacheOperationAdapter {
    pub fn new(
        service: impl Into<String>,
        inner: Box<dyn Operation>,
        storage: Arc<dyn CacheStorage>,
    ) -> Self {
        Self {
            service: service.into(),
            inner,
            storage,
        }
    }

    fn key(&self, kind: &str) -> String {
        format!("{}:{}:{}", self.service, self.inner.id(), kind)
    }
}

fn fingerprint(security: &SecurityComponents) -> u64 {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(security)
        .unwrap_or_default()
        .hash(&mut hasher);
    hasher.finish()
}

impl Operation for CacheOperationAdapter {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn unwrap(&self) -> &dyn Operation {
        self.inner.unwrap()
    }

    fn request(&self, security: &SecurityComponents) -> OperationRequest {
        let key = format!("{}:{:016x}", self.key("request"), fingerprint(security));
        if let Some(CacheEntry::Request(request)) = self.storage.get(&key) {
            return request;
        }

        let request = self.inner.request(security);
        self.storage.set(&key, CacheEntry::Request(request.clone()));
        request
    }

    fn response(&self) -> OperationResponse {
        let key = self.key("response");
        if let Some(CacheEntry::Response(response)) = self.storage.get(&key) {
            return response;
        }

        let response = self.inner.response();
        self.storage.set(&key, CacheEntry::Response(response.clone()));
        response
    }

    fn set_parse_config(&mut self, config: ParseConfig) {
        self.inner.set_parse_config(config);
    }
}
