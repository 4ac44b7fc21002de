// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! In-process key-value store.
//!
//! Same contract as the Redis backend, scoped to one process. Expiry is read
//! from the injected clock so TTL boundaries can be stepped in tests. The
//! consume operation runs under the DashMap shard lock for the key, which
//! makes it linearizable against every other call in this process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{evaluate_consume, ConsumeOutcome, ConsumeVerdict, KvStore};
use crate::clock::{Clock, SystemClock};
use crate::error::StoreResult;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at_ms: i64,
}

impl MemoryEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// Thread-safe in-memory store with per-key expiry.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, MemoryEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create a store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a value while keeping its expiry. Used to simulate corrupted
    /// persisted state.
    pub fn overwrite_raw(&self, key: &str, value: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.value = value.to_string();
                true
            }
            None => false,
        }
    }

    fn purge_if_expired(&self, key: &str, now: i64) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now_millis();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        self.purge_if_expired(key, now);
        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let expires_at_ms = self.clock.now_millis() + ttl.as_millis() as i64;
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now_millis();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = self.clock.now_millis();
        let remaining = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| Duration::from_millis((entry.expires_at_ms - now) as u64));
        Ok(remaining)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let now = self.clock.now_millis();
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.is_expired(now))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn consume_proposal(
        &self,
        key: &str,
        token_hash: &str,
        now_millis: i64,
    ) -> StoreResult<ConsumeOutcome> {
        // Store-native expiry uses the store's own clock, the explicit
        // record check uses the caller's `now_millis`.
        let store_now = self.clock.now_millis();

        let mut occupied = match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) => occupied,
            Entry::Vacant(_) => return Ok(ConsumeOutcome::not_found()),
        };

        if occupied.get().is_expired(store_now) {
            occupied.remove();
            return Ok(ConsumeOutcome::not_found());
        }

        let original = occupied.get().value.clone();
        let (verdict, rewritten) = evaluate_consume(&original, token_hash, now_millis);

        match verdict {
            ConsumeVerdict::NotFound => return Ok(ConsumeOutcome::not_found()),
            ConsumeVerdict::Expired => {
                occupied.remove();
            }
            ConsumeVerdict::Consumed => {
                if let Some(rewritten) = rewritten {
                    occupied.get_mut().value = rewritten;
                }
            }
            ConsumeVerdict::AlreadyConsumed | ConsumeVerdict::TokenMismatch => {}
        }

        Ok(ConsumeOutcome {
            verdict,
            record: Some(original),
        })
    }
}
