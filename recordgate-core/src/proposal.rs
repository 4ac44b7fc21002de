// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Proposal Manager: two-phase propose/confirm for destructive operations.
//!
//! Lifecycle: Pending → Consumed (terminal). A pending proposal that outlives
//! its TTL is removed by the store. The flip from Pending to Consumed happens
//! inside the store's atomic consume operation and nowhere else, so at most
//! one confirm call per proposal can ever succeed, across every replica.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::audit::{AuditEvent, AuditSink};
use crate::clock::Clock;
use crate::config::ProposalConfig;
use crate::error::{ConfirmError, GateError, GateResult};
use crate::keys::KeyLayout;
use crate::metrics;
use crate::store::{ConsumeVerdict, KvStore};
use crate::types::{ProposalId, RecordId, TableName};

/// Random bytes per confirmation token.
const TOKEN_BYTES: usize = 32;

/// Kind of destructive operation a proposal gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    DeleteRecord,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DeleteRecord => "delete_record",
        }
    }

    /// Default impact summary shown before confirmation.
    pub fn describe(&self, target: &Target) -> String {
        match self {
            Self::DeleteRecord => format!(
                "Permanently delete record '{}' from table '{}'. This cannot be undone.",
                target.record_id, target.table
            ),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The record a proposal applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub table: TableName,
    pub record_id: RecordId,
}

impl Target {
    pub fn new(table: TableName, record_id: RecordId) -> Self {
        Self { table, record_id }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.record_id)
    }
}

/// Proposal lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Waiting for a confirm call with the matching token.
    Pending,

    /// Confirmed exactly once. Terminal.
    Consumed,
}

impl ProposalStatus {
    /// Stored representation, also matched by the store's consume script.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Consumed => "consumed",
        }
    }

    pub fn can_transition_to(&self, target: ProposalStatus) -> bool {
        matches!((self, target), (Self::Pending, Self::Consumed))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Consumed)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted proposal. Never contains the plaintext token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub proposal_id: ProposalId,
    pub operation: Operation,
    pub target: Target,
    pub impact_summary: String,
    pub token_hash: String,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
    pub status: ProposalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at_ms: Option<i64>,
}

/// What the caller gets back from `propose`. The only place the plaintext
/// token ever appears.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalReceipt {
    pub proposal_id: ProposalId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub impact_summary: String,
}

/// Issues and consumes one-time confirmation tokens.
#[derive(Debug, Clone)]
pub struct ProposalManager {
    store: Arc<dyn KvStore>,
    layout: KeyLayout,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl ProposalManager {
    pub fn new(
        store: Arc<dyn KvStore>,
        layout: KeyLayout,
        config: &ProposalConfig,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            layout,
            ttl: config.confirm_token_ttl,
            clock,
            audit,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a pending proposal and return its one-time token.
    ///
    /// The record is written in a single store call, so a failed or timed-out
    /// propose leaves nothing behind that could later be confirmed.
    pub async fn propose(
        &self,
        operation: Operation,
        target: Target,
        impact_summary: impl Into<String>,
    ) -> GateResult<ProposalReceipt> {
        let proposal_id = ProposalId::generate();
        let token = generate_token();
        let impact_summary = impact_summary.into();

        let created_at_ms = self.clock.now_millis();
        let expires_at_ms = created_at_ms + self.ttl.as_millis() as i64;

        let record = ProposalRecord {
            proposal_id,
            operation,
            target: target.clone(),
            impact_summary: impact_summary.clone(),
            token_hash: hash_token(&token),
            created_at_ms,
            expires_at_ms,
            status: ProposalStatus::Pending,
            consumed_at_ms: None,
        };
        let encoded = serde_json::to_string(&record).map_err(|e| GateError::Serialization {
            context: "proposal record",
            message: e.to_string(),
        })?;

        self.store
            .set_with_expiry(&self.layout.proposal_key(&proposal_id), &encoded, self.ttl)
            .await?;

        let expires_at = millis_to_datetime(expires_at_ms);

        tracing::info!(
            proposal_id = %proposal_id,
            operation = %operation,
            target = %target,
            expires_at = %expires_at,
            "Proposal created"
        );
        metrics::record_proposal_created(operation.as_str());
        self.audit.emit(&AuditEvent::ProposalCreated {
            proposal_id,
            operation,
            target,
            impact_summary: impact_summary.clone(),
            expires_at,
        });

        Ok(ProposalReceipt {
            proposal_id,
            token,
            expires_at,
            impact_summary,
        })
    }

    /// Atomically validate and consume a proposal.
    ///
    /// On success the caller is authorized to perform the operation on the
    /// returned target. Every failure is terminal for this attempt.
    pub async fn confirm(
        &self,
        proposal_id: &ProposalId,
        token: &str,
    ) -> Result<Target, ConfirmError> {
        let key = self.layout.proposal_key(proposal_id);
        let token_hash = hash_token(token);
        let now_millis = self.clock.now_millis();

        let outcome = match self
            .store
            .consume_proposal(&key, &token_hash, now_millis)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = ConfirmError::from(e);
                self.report_confirm(proposal_id, None, &Err(&err));
                return Err(err);
            }
        };

        let record = outcome.record.as_deref().and_then(|raw| {
            serde_json::from_str::<ProposalRecord>(raw)
                .map_err(|e| {
                    tracing::warn!(
                        proposal_id = %proposal_id,
                        error = %e,
                        "Unreadable proposal record"
                    );
                })
                .ok()
        });

        let proposal_id = *proposal_id;
        let result = match (outcome.verdict, &record) {
            (ConsumeVerdict::Consumed, Some(record)) => Ok(record.target.clone()),
            (ConsumeVerdict::Consumed, None) | (ConsumeVerdict::NotFound, _) => {
                Err(ConfirmError::NotFound { proposal_id })
            }
            (ConsumeVerdict::Expired, _) => Err(ConfirmError::Expired { proposal_id }),
            (ConsumeVerdict::AlreadyConsumed, _) => {
                Err(ConfirmError::AlreadyConsumed { proposal_id })
            }
            (ConsumeVerdict::TokenMismatch, _) => Err(ConfirmError::TokenMismatch { proposal_id }),
        };

        self.report_confirm(&proposal_id, record.as_ref(), &result.as_ref());
        result
    }

    /// Current status of a proposal, `None` when absent, expired or unreadable.
    pub async fn status(&self, proposal_id: &ProposalId) -> GateResult<Option<ProposalStatus>> {
        let key = self.layout.proposal_key(proposal_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<ProposalRecord>(&raw) {
            Ok(record) if self.clock.now_millis() >= record.expires_at_ms => Ok(None),
            Ok(record) => Ok(Some(record.status)),
            Err(e) => {
                tracing::warn!(
                    proposal_id = %proposal_id,
                    error = %e,
                    "Unreadable proposal record treated as absent"
                );
                Ok(None)
            }
        }
    }

    fn report_confirm(
        &self,
        proposal_id: &ProposalId,
        record: Option<&ProposalRecord>,
        result: &Result<&Target, &ConfirmError>,
    ) {
        let outcome = match result {
            Ok(_) => ConsumeVerdict::Consumed.tag(),
            Err(e) => e.kind(),
        };

        match result {
            Ok(target) => tracing::info!(
                proposal_id = %proposal_id,
                target = %target,
                "Proposal confirmed"
            ),
            Err(ConfirmError::Store(e)) => tracing::error!(
                proposal_id = %proposal_id,
                error = %e,
                "Confirmation failed on store error"
            ),
            Err(_) => tracing::info!(
                proposal_id = %proposal_id,
                outcome,
                "Confirmation rejected"
            ),
        }

        metrics::record_confirm_outcome(outcome);
        self.audit.emit(&AuditEvent::ConfirmAttempt {
            proposal_id: *proposal_id,
            operation: record.map(|r| r.operation),
            target: record.map(|r| r.target.clone()),
            outcome,
        });
    }
}

/// Fresh URL-safe confirmation token with 256 bits of entropy.
fn generate_token() -> String {
    use base64::Engine;
    use rand::RngCore;
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// One-way digest stored in place of the token.
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CollectingAuditSink;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use proptest::prelude::*;

    struct Fixture {
        manager: ProposalManager,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        audit: Arc<CollectingAuditSink>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let audit = Arc::new(CollectingAuditSink::new());
        let manager = ProposalManager::new(
            store.clone(),
            KeyLayout::default(),
            &ProposalConfig::default(),
            clock.clone(),
            audit.clone(),
        );
        Fixture {
            manager,
            store,
            clock,
            audit,
        }
    }

    fn contact() -> Target {
        Target::new(
            TableName::new("contact").unwrap(),
            RecordId::new("abc-123").unwrap(),
        )
    }

    #[test]
    fn test_status_transitions() {
        assert!(ProposalStatus::Pending.can_transition_to(ProposalStatus::Consumed));
        assert!(!ProposalStatus::Consumed.can_transition_to(ProposalStatus::Pending));
        assert!(!ProposalStatus::Consumed.can_transition_to(ProposalStatus::Consumed));
        assert!(!ProposalStatus::Pending.can_transition_to(ProposalStatus::Pending));
        assert!(ProposalStatus::Consumed.is_terminal());
    }

    #[test]
    fn test_describe_mentions_target() {
        let summary = Operation::DeleteRecord.describe(&contact());
        assert!(summary.contains("abc-123"));
        assert!(summary.contains("contact"));
        assert_eq!(contact().to_string(), "contact/abc-123");
    }

    #[tokio::test]
    async fn test_propose_then_confirm_once() {
        let fx = fixture();
        let receipt = fx
            .manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();

        let expected = fx.clock.now() + chrono::Duration::seconds(120);
        assert_eq!(receipt.expires_at, expected);

        let target = fx
            .manager
            .confirm(&receipt.proposal_id, &receipt.token)
            .await
            .unwrap();
        assert_eq!(target, contact());

        let again = fx
            .manager
            .confirm(&receipt.proposal_id, &receipt.token)
            .await;
        assert!(matches!(again, Err(ConfirmError::AlreadyConsumed { .. })));
    }

    #[tokio::test]
    async fn test_record_never_holds_plaintext_token() {
        let fx = fixture();
        let receipt = fx
            .manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();

        let key = KeyLayout::default().proposal_key(&receipt.proposal_id);
        let raw = fx.store.get(&key).await.unwrap().unwrap();
        assert!(!raw.contains(&receipt.token));

        let record: ProposalRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.token_hash, hash_token(&receipt.token));
        assert_eq!(record.status, ProposalStatus::Pending);
        assert_eq!(record.expires_at_ms - record.created_at_ms, 120_000);

        let ttl = fx.store.ttl(&key).await.unwrap().unwrap();
        assert_eq!(ttl, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_wrong_token_keeps_pending() {
        let fx = fixture();
        let receipt = fx
            .manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();

        let result = fx.manager.confirm(&receipt.proposal_id, "guess").await;
        assert!(matches!(result, Err(ConfirmError::TokenMismatch { .. })));
        assert_eq!(
            fx.manager.status(&receipt.proposal_id).await.unwrap(),
            Some(ProposalStatus::Pending)
        );

        assert!(fx
            .manager
            .confirm(&receipt.proposal_id, &receipt.token)
            .await
            .is_ok());
        assert_eq!(
            fx.manager.status(&receipt.proposal_id).await.unwrap(),
            Some(ProposalStatus::Consumed)
        );
    }

    #[tokio::test]
    async fn test_unknown_proposal_not_found() {
        let fx = fixture();
        let result = fx.manager.confirm(&ProposalId::generate(), "token").await;
        assert!(matches!(result, Err(ConfirmError::NotFound { .. })));
        assert_eq!(fx.manager.status(&ProposalId::generate()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_expiry_reports_not_found() {
        let fx = fixture();
        let receipt = fx
            .manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();

        fx.clock.advance(Duration::from_secs(121));
        let result = fx.manager.confirm(&receipt.proposal_id, &receipt.token).await;
        assert!(matches!(result, Err(ConfirmError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_explicit_expiry_check_when_store_lags() {
        // Store keeps its own clock, so only the record's expires_at catches this.
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        let manager = ProposalManager::new(
            store.clone(),
            KeyLayout::default(),
            &ProposalConfig::default(),
            clock.clone(),
            Arc::new(CollectingAuditSink::new()),
        );
        let receipt = manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();

        clock.advance(Duration::from_secs(120));
        assert_eq!(manager.status(&receipt.proposal_id).await.unwrap(), None);

        let result = manager.confirm(&receipt.proposal_id, &receipt.token).await;
        assert!(matches!(result, Err(ConfirmError::Expired { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_not_found() {
        let fx = fixture();
        let receipt = fx
            .manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();

        let key = KeyLayout::default().proposal_key(&receipt.proposal_id);
        assert!(fx.store.overwrite_raw(&key, "{garbage"));

        assert_eq!(fx.manager.status(&receipt.proposal_id).await.unwrap(), None);
        let result = fx.manager.confirm(&receipt.proposal_id, &receipt.token).await;
        assert!(matches!(result, Err(ConfirmError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_target_is_not_found_and_left_untouched() {
        let fx = fixture();
        let receipt = fx
            .manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();

        let key = KeyLayout::default().proposal_key(&receipt.proposal_id);
        let raw = fx.store.get(&key).await.unwrap().unwrap();
        let corrupted = raw.replace("\"contact\"", "\"bad table\"");
        assert_ne!(raw, corrupted);
        assert!(fx.store.overwrite_raw(&key, &corrupted));

        for _ in 0..2 {
            let result = fx.manager.confirm(&receipt.proposal_id, &receipt.token).await;
            assert!(matches!(result, Err(ConfirmError::NotFound { .. })));
            assert_eq!(fx.store.get(&key).await.unwrap(), Some(corrupted.clone()));
        }
        assert_eq!(fx.manager.status(&receipt.proposal_id).await.unwrap(), None);

        let last = fx.audit.events().pop().unwrap();
        assert!(matches!(
            last,
            AuditEvent::ConfirmAttempt {
                target: None,
                outcome: "not_found",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_audit_trail_has_no_secrets() {
        let fx = fixture();
        let receipt = fx
            .manager
            .propose(Operation::DeleteRecord, contact(), "delete it")
            .await
            .unwrap();
        let _ = fx.manager.confirm(&receipt.proposal_id, "wrong").await;
        let _ = fx
            .manager
            .confirm(&receipt.proposal_id, &receipt.token)
            .await;

        let events = fx.audit.events();
        assert_eq!(events.len(), 3);

        let outcomes: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AuditEvent::ConfirmAttempt {
                    outcome, target, ..
                } => {
                    assert_eq!(target.as_ref(), Some(&contact()));
                    Some(*outcome)
                }
                _ => None,
            })
            .collect();
        assert_eq!(outcomes, vec!["token_mismatch", "consumed"]);

        let hash = hash_token(&receipt.token);
        for event in &events {
            let json = serde_json::to_string(event).unwrap();
            assert!(!json.contains(&receipt.token));
            assert!(!json.contains(&hash));
        }
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(generate_token(), token);
    }

    proptest! {
        #[test]
        fn prop_hash_is_hex_sha256(token in ".{0,64}") {
            let hash = hash_token(&token);
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            prop_assert_eq!(hash_token(&token), hash);
        }

        #[test]
        fn prop_distinct_tokens_distinct_hashes(a in "[A-Za-z0-9_-]{1,43}", b in "[A-Za-z0-9_-]{1,43}") {
            prop_assume!(a != b);
            prop_assert_ne!(hash_token(&a), hash_token(&b));
        }
    }
}
