//! Session-scoped attribute value cache
//!
//! Prevents attribute values from being fetched twice for the same
//! entity, e.g. when processing an entity's parent group and then the
//! entity itself. Concurrent callers for the same path are coalesced
//! into a single backend request; successful results are memoized for
//! the lifetime of the owning provider session (insert-if-absent, no
//! eviction). Failed fetches are not cached, so a later call retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use imview_core::ImviewResult;

use crate::api::AttrValues;

/// Memoized, coalesced attribute-value store for one provider session
#[derive(Default)]
pub struct AttributeCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<AttrValues>>>>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the attribute values for `path`, fetching them at most once
    ///
    /// Among any number of concurrent callers, exactly one `fetch`
    /// future runs; all callers receive the same resolved mapping. An
    /// error leaves the entry unset.
    pub async fn get_or_fetch<F, Fut>(&self, path: &str, fetch: F) -> ImviewResult<AttrValues>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ImviewResult<AttrValues>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let values = cell
            .get_or_try_init(|| async {
                tracing::debug!(path, "fetching attribute values");
                fetch().await
            })
            .await?;

        Ok(values.clone())
    }

    /// Already-memoized values for `path`, if any
    pub async fn peek(&self, path: &str) -> Option<AttrValues> {
        let entries = self.entries.lock().await;
        entries.get(path)?.get().cloned()
    }
}
