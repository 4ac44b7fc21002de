// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Namespaced read-through cache over the shared store.
//!
//! Each namespace has one fixed TTL. The store's native expiry is the only
//! staleness mechanism: a value the store returns is served as-is. Concurrent
//! misses on the same key are not coordinated; each caller fetches and the
//! last write wins. That is only sound because fetchers are idempotent reads
//! from the remote source of truth.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CacheConfig;
use crate::error::{FetchError, GateError, GateResult};
use crate::keys::KeyLayout;
use crate::metrics;
use crate::store::KvStore;
use crate::types::{Principal, TableName};

/// Identity key used when no principal is known (single-user mode).
pub const GLOBAL_IDENTITY_KEY: &str = "__global__";

/// The one key under which the table list is cached.
pub const TABLE_LIST_KEY: &str = "all";

/// Category of cached data; determines the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Signed-in principal's identity record.
    Identity,
    /// Field definitions of one table.
    Schema,
    /// List of available tables.
    TableList,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 3] = [Self::Identity, Self::Schema, Self::TableList];

    /// Tag used in store keys.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Schema => "schema",
            Self::TableList => "table-list",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.tag() == tag)
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// TTL per namespace. A zero TTL means the namespace is not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub identity: Duration,
    pub schema: Duration,
    pub table_list: Duration,
}

impl CachePolicy {
    pub fn ttl(&self, namespace: CacheNamespace) -> Duration {
        match namespace {
            CacheNamespace::Identity => self.identity,
            CacheNamespace::Schema => self.schema,
            CacheNamespace::TableList => self.table_list,
        }
    }

    pub fn is_enabled(&self, namespace: CacheNamespace) -> bool {
        !self.ttl(namespace).is_zero()
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            identity: config.identity_ttl,
            schema: config.schema_ttl,
            table_list: config.table_list_ttl,
        }
    }
}

/// Read-through cache for identity, schema and table-list lookups.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: Arc<dyn KvStore>,
    layout: KeyLayout,
    policy: CachePolicy,
    fetch_timeout: Duration,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KvStore>, layout: KeyLayout, config: &CacheConfig) -> Self {
        Self {
            store,
            layout,
            policy: CachePolicy::from(config),
            fetch_timeout: config.fetch_timeout,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Serve `(namespace, key)` from the store, or fetch, store and return it.
    ///
    /// A hit has no side effect. On a miss `fetch` runs exactly once; its
    /// error is returned unchanged and nothing is cached.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        namespace: CacheNamespace,
        key: &str,
        fetch: F,
    ) -> GateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if self.policy.is_enabled(namespace) {
            if let Some(value) = self.lookup::<T>(namespace, key).await? {
                metrics::record_cache_lookup(namespace, "hit");
                tracing::debug!(namespace = %namespace, key = %key, "Cache hit");
                return Ok(value);
            }
            metrics::record_cache_lookup(namespace, "miss");
            tracing::debug!(namespace = %namespace, key = %key, "Cache miss, fetching");
        } else {
            metrics::record_cache_lookup(namespace, "bypass");
        }

        self.fetch_and_store(namespace, key, fetch).await
    }

    /// Fetch unconditionally, overwrite the entry and reset its TTL.
    pub async fn refresh<T, F, Fut>(
        &self,
        namespace: CacheNamespace,
        key: &str,
        fetch: F,
    ) -> GateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        metrics::record_cache_lookup(namespace, "refresh");
        tracing::debug!(namespace = %namespace, key = %key, "Cache refresh");
        self.fetch_and_store(namespace, key, fetch).await
    }

    /// Remove one entry. Returns whether anything was cached.
    pub async fn invalidate(&self, namespace: CacheNamespace, key: &str) -> GateResult<bool> {
        let removed = self
            .store
            .delete(&self.layout.cache_key(namespace, key))
            .await?;
        tracing::info!(namespace = %namespace, key = %key, removed, "Cache entry invalidated");
        Ok(removed)
    }

    /// Remove every entry of a namespace. Returns how many were removed.
    ///
    /// Clearing the schema namespace also drops the cached table list, since
    /// the list is derived from the same metadata.
    pub async fn invalidate_namespace(&self, namespace: CacheNamespace) -> GateResult<usize> {
        let mut removed = self
            .store
            .delete_prefix(&self.layout.cache_namespace_prefix(namespace))
            .await?;
        if namespace == CacheNamespace::Schema {
            let list_key = self
                .layout
                .cache_key(CacheNamespace::TableList, TABLE_LIST_KEY);
            if self.store.delete(&list_key).await? {
                removed += 1;
            }
        }
        tracing::info!(namespace = %namespace, removed, "Cache namespace invalidated");
        Ok(removed)
    }

    /// Discriminators currently cached in a namespace, e.g. the table names
    /// whose schema is cached.
    pub async fn cached_keys(&self, namespace: CacheNamespace) -> GateResult<Vec<String>> {
        let prefix = self.layout.cache_namespace_prefix(namespace);
        let mut keys: Vec<String> = self
            .store
            .keys_with_prefix(&prefix)
            .await?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Identity of `principal`, or of the single local user when `None`.
    pub async fn identity<T, F, Fut>(&self, principal: Option<&Principal>, fetch: F) -> GateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let key = principal.map_or(GLOBAL_IDENTITY_KEY, Principal::as_str);
        self.get_or_fetch(CacheNamespace::Identity, key, fetch).await
    }

    /// Field definitions of `table`.
    pub async fn schema<T, F, Fut>(&self, table: &TableName, fetch: F) -> GateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        self.get_or_fetch(CacheNamespace::Schema, table.as_str(), fetch)
            .await
    }

    /// The list of available tables.
    pub async fn table_list<T, F, Fut>(&self, fetch: F) -> GateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        self.get_or_fetch(CacheNamespace::TableList, TABLE_LIST_KEY, fetch)
            .await
    }

    /// Read and decode an entry. Undecodable entries count as a miss.
    async fn lookup<T: DeserializeOwned>(
        &self,
        namespace: CacheNamespace,
        key: &str,
    ) -> GateResult<Option<T>> {
        let Some(raw) = self.store.get(&self.layout.cache_key(namespace, key)).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(
                    namespace = %namespace,
                    key = %key,
                    error = %e,
                    "Discarding unreadable cache entry"
                );
                Ok(None)
            }
        }
    }

    async fn fetch_and_store<T, F, Fut>(
        &self,
        namespace: CacheNamespace,
        key: &str,
        fetch: F,
    ) -> GateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let value = match tokio::time::timeout(self.fetch_timeout, fetch()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GateError::FetchTimeout {
                    namespace: namespace.tag(),
                    after_ms: self.fetch_timeout.as_millis() as u64,
                })
            }
        };

        let ttl = self.policy.ttl(namespace);
        if ttl.is_zero() {
            return Ok(value);
        }

        let encoded = serde_json::to_string(&value).map_err(|e| GateError::Serialization {
            context: "encoding cache entry",
            message: e.to_string(),
        })?;
        self.store
            .set_with_expiry(&self.layout.cache_key(namespace, key), &encoded, ttl)
            .await?;

        tracing::debug!(
            namespace = %namespace,
            key = %key,
            ttl_secs = ttl.as_secs(),
            "Cache entry stored"
        );
        Ok(value)
    }
}
