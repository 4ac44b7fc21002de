// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Audit events for destructive-action proposals.
//!
//! Events carry the operation, target and outcome. They never carry the
//! plaintext confirmation token or its hash.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::proposal::{Operation, Target};
use crate::types::ProposalId;

/// Tracing target for audit output, kept apart from application logs.
pub const AUDIT_TARGET: &str = "recordgate::audit";

/// Structured audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    ProposalCreated {
        proposal_id: ProposalId,
        operation: Operation,
        target: Target,
        impact_summary: String,
        expires_at: DateTime<Utc>,
    },
    ConfirmAttempt {
        proposal_id: ProposalId,
        /// Absent when the proposal could not be found.
        operation: Option<Operation>,
        target: Option<Target>,
        /// `consumed` or a confirm error kind.
        outcome: &'static str,
    },
}

impl AuditEvent {
    pub fn proposal_id(&self) -> &ProposalId {
        match self {
            Self::ProposalCreated { proposal_id, .. } => proposal_id,
            Self::ConfirmAttempt { proposal_id, .. } => proposal_id,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProposalCreated { .. } => "proposal_created",
            Self::ConfirmAttempt { .. } => "confirm_attempt",
        }
    }
}

/// Destination for audit events. Emission must not fail the caller.
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    fn emit(&self, event: &AuditEvent);
}

/// Writes each event as one JSON object on the [`AUDIT_TARGET`] tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!(target: AUDIT_TARGET, "{}", json),
            Err(e) => tracing::error!(
                target: AUDIT_TARGET,
                event = event.name(),
                proposal_id = %event.proposal_id(),
                error = %e,
                "Failed to serialize audit event"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl CollectingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for CollectingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, TableName};

    fn target() -> Target {
        Target::new(
            TableName::new("contact").unwrap(),
            RecordId::new("abc-123").unwrap(),
        )
    }

    #[test]
    fn test_confirm_event_json_shape() {
        let id = ProposalId::generate();
        let event = AuditEvent::ConfirmAttempt {
            proposal_id: id,
            operation: Some(Operation::DeleteRecord),
            target: Some(target()),
            outcome: "token_mismatch",
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "confirm_attempt");
        assert_eq!(json["proposal_id"], id.to_string());
        assert_eq!(json["operation"], "delete_record");
        assert_eq!(json["target"]["table"], "contact");
        assert_eq!(json["target"]["record_id"], "abc-123");
        assert_eq!(json["outcome"], "token_mismatch");
    }

    #[test]
    fn test_not_found_event_has_null_target() {
        let event = AuditEvent::ConfirmAttempt {
            proposal_id: ProposalId::generate(),
            operation: None,
            target: None,
            outcome: "not_found",
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert!(json["target"].is_null());
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingAuditSink::new();
        let id = ProposalId::generate();
        sink.emit(&AuditEvent::ProposalCreated {
            proposal_id: id,
            operation: Operation::DeleteRecord,
            target: target(),
            impact_summary: "Delete contact/abc-123".to_string(),
            expires_at: Utc::now(),
        });
        sink.emit(&AuditEvent::ConfirmAttempt {
            proposal_id: id,
            operation: Some(Operation::DeleteRecord),
            target: Some(target()),
            outcome: "consumed",
        });

        let names: Vec<_> = sink.events().iter().map(AuditEvent::name).collect();
        assert_eq!(names, vec!["proposal_created", "confirm_attempt"]);
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        TracingAuditSink.emit(&AuditEvent::ConfirmAttempt {
            proposal_id: ProposalId::generate(),
            operation: None,
            target: None,
            outcome: "not_found",
        });
    }
}
