// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared key-value store adapter.
//!
//! All authoritative state lives behind [`KvStore`]. Replicas hold no copies,
//! so the store is also the transaction boundary: the proposal consume step is
//! a single atomic operation executed by the store itself.

mod memory;
mod redis_store;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::Clock;
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::proposal::{ProposalRecord, ProposalStatus};

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Result of the atomic check-and-flip on a proposal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeVerdict {
    /// Status flipped from pending to consumed by this call.
    Consumed,
    NotFound,
    Expired,
    AlreadyConsumed,
    TokenMismatch,
}

impl ConsumeVerdict {
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Consumed => "consumed",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::AlreadyConsumed => "already_consumed",
            Self::TokenMismatch => "token_mismatch",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "consumed" => Some(Self::Consumed),
            "not_found" => Some(Self::NotFound),
            "expired" => Some(Self::Expired),
            "already_consumed" => Some(Self::AlreadyConsumed),
            "token_mismatch" => Some(Self::TokenMismatch),
            _ => None,
        }
    }
}

impl fmt::Display for ConsumeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Verdict plus the record as it was before the call (absent for `NotFound`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub verdict: ConsumeVerdict,
    pub record: Option<String>,
}

impl ConsumeOutcome {
    pub fn not_found() -> Self {
        Self {
            verdict: ConsumeVerdict::NotFound,
            record: None,
        }
    }
}

/// Networked key-value store with expiry and an atomic proposal consume.
#[async_trait]
pub trait KvStore: Send + Sync + fmt::Debug {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value`, replacing any previous value and resetting the expiry.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Remaining time to live, `None` when the key is absent.
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Keys currently present that start with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// In one indivisible step: check the proposal at `key` exists, has not
    /// expired at `now_millis`, is pending and carries `token_hash`; if so
    /// flip it to consumed. Never mutates anything on failure, except that an
    /// expired record is removed.
    async fn consume_proposal(
        &self,
        key: &str,
        token_hash: &str,
        now_millis: i64,
    ) -> StoreResult<ConsumeOutcome>;

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<usize> {
        let mut removed = 0;
        for key in self.keys_with_prefix(prefix).await? {
            if self.delete(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Open the store selected by the configuration.
pub async fn connect(config: &StoreConfig, clock: Arc<dyn Clock>) -> StoreResult<Arc<dyn KvStore>> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.url, config.op_timeout).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::with_clock(clock))),
    }
}

/// Decision applied to a stored proposal by the in-process backend. Mirrors
/// the server-side script of the Redis backend check for check.
///
/// A record that does not decode as a complete [`ProposalRecord`] is treated
/// as absent and never rewritten. Returns the verdict and, when consumed, the
/// rewritten record.
pub(crate) fn evaluate_consume(
    raw: &str,
    token_hash: &str,
    now_millis: i64,
) -> (ConsumeVerdict, Option<String>) {
    let Ok(mut record) = serde_json::from_str::<ProposalRecord>(raw) else {
        return (ConsumeVerdict::NotFound, None);
    };

    if now_millis >= record.expires_at_ms {
        return (ConsumeVerdict::Expired, None);
    }

    if record.status != ProposalStatus::Pending {
        return (ConsumeVerdict::AlreadyConsumed, None);
    }

    if record.token_hash != token_hash {
        return (ConsumeVerdict::TokenMismatch, None);
    }

    record.status = ProposalStatus::Consumed;
    record.consumed_at_ms = Some(now_millis);

    match serde_json::to_string(&record) {
        Ok(rewritten) => (ConsumeVerdict::Consumed, Some(rewritten)),
        Err(_) => (ConsumeVerdict::NotFound, None),
    }
}

pub(crate) fn backend_error(operation: &'static str, reason: impl fmt::Display) -> StoreError {
    StoreError::Backend {
        operation,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    fn record_json(status: &str, hash: &str, expires_at_ms: i64) -> Value {
        serde_json::json!({
            "proposal_id": "6f1c1f3e-5a43-4c55-9d39-5d2d8f0e7a10",
            "operation": "delete_record",
            "target": { "table": "contact", "record_id": "abc-123" },
            "impact_summary": "Delete contact/abc-123",
            "token_hash": hash,
            "created_at_ms": expires_at_ms - 120_000,
            "expires_at_ms": expires_at_ms,
            "status": status,
        })
    }

    fn record(status: &str, hash: &str, expires_at_ms: i64) -> String {
        record_json(status, hash, expires_at_ms).to_string()
    }

    #[test]
    fn test_pending_with_matching_hash_is_consumed() {
        let raw = record("pending", "abc", 2_000);
        let (verdict, rewritten) = evaluate_consume(&raw, "abc", 1_000);
        assert_eq!(verdict, ConsumeVerdict::Consumed);

        let rewritten: Value = serde_json::from_str(&rewritten.unwrap()).unwrap();
        assert_eq!(rewritten["status"], "consumed");
        assert_eq!(rewritten["consumed_at_ms"], 1_000);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let raw = record("pending", "abc", 2_000);
        assert_eq!(evaluate_consume(&raw, "abc", 1_999).0, ConsumeVerdict::Consumed);
        assert_eq!(evaluate_consume(&raw, "abc", 2_000).0, ConsumeVerdict::Expired);
    }

    #[test]
    fn test_expired_wins_over_consumed() {
        let raw = record("consumed", "abc", 2_000);
        assert_eq!(evaluate_consume(&raw, "abc", 5_000).0, ConsumeVerdict::Expired);
    }

    #[test]
    fn test_consumed_wins_over_token_check() {
        let raw = record("consumed", "abc", 2_000);
        assert_eq!(
            evaluate_consume(&raw, "abc", 1_000).0,
            ConsumeVerdict::AlreadyConsumed
        );
        assert_eq!(
            evaluate_consume(&raw, "wrong", 1_000).0,
            ConsumeVerdict::AlreadyConsumed
        );
    }

    #[test]
    fn test_mismatch_leaves_record_untouched() {
        let raw = record("pending", "abc", 2_000);
        let (verdict, rewritten) = evaluate_consume(&raw, "xyz", 1_000);
        assert_eq!(verdict, ConsumeVerdict::TokenMismatch);
        assert!(rewritten.is_none());
    }

    #[test]
    fn test_corrupt_record_is_absent() {
        assert_eq!(evaluate_consume("{not json", "abc", 0).0, ConsumeVerdict::NotFound);
        assert_eq!(evaluate_consume("[1,2]", "abc", 0).0, ConsumeVerdict::NotFound);
        let no_expiry = serde_json::json!({"status": "pending", "token_hash": "abc"}).to_string();
        assert_eq!(evaluate_consume(&no_expiry, "abc", 0).0, ConsumeVerdict::NotFound);
    }

    #[test]
    fn test_record_with_invalid_target_is_absent() {
        let mut bad_table = record_json("pending", "abc", 2_000);
        bad_table["target"]["table"] = Value::from("bad table");
        let (verdict, rewritten) = evaluate_consume(&bad_table.to_string(), "abc", 1_000);
        assert_eq!(verdict, ConsumeVerdict::NotFound);
        assert!(rewritten.is_none());

        let mut no_operation = record_json("pending", "abc", 2_000);
        no_operation.as_object_mut().unwrap().remove("operation");
        assert_eq!(
            evaluate_consume(&no_operation.to_string(), "abc", 1_000).0,
            ConsumeVerdict::NotFound
        );

        let mut bad_status = record_json("pending", "abc", 2_000);
        bad_status["status"] = Value::from("approved");
        assert_eq!(
            evaluate_consume(&bad_status.to_string(), "abc", 1_000).0,
            ConsumeVerdict::NotFound
        );
    }

    #[test]
    fn test_verdict_tags_round_trip() {
        for verdict in [
            ConsumeVerdict::Consumed,
            ConsumeVerdict::NotFound,
            ConsumeVerdict::Expired,
            ConsumeVerdict::AlreadyConsumed,
            ConsumeVerdict::TokenMismatch,
        ] {
            assert_eq!(ConsumeVerdict::from_tag(verdict.tag()), Some(verdict));
        }
        assert_eq!(ConsumeVerdict::from_tag("bogus"), None);
    }
}
