//! Custom error types for recordgate.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`.
//! Proposal validation failures are expected outcomes and get their own enum
//! so callers can word user-facing messages precisely.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProposalId;

/// Top-level error type for the gate.
#[derive(Debug, Error)]
pub enum GateError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Shared Store Errors - Fatal for the current request
    // =========================================================================
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // =========================================================================
    // Fetcher Errors - Propagated unchanged, nothing cached
    // =========================================================================
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Fetcher for namespace '{namespace}' timed out after {after_ms}ms")]
    FetchTimeout {
        namespace: &'static str,
        after_ms: u64,
    },

    // =========================================================================
    // Proposal Errors
    // =========================================================================
    #[error("Confirmation failed: {0}")]
    Confirm(#[from] ConfirmError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("Serialization error: {context} - {message}")]
    Serialization {
        context: &'static str,
        message: String,
    },

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors reject a configuration or identifier outright.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported store URL scheme: {url}")]
    UnsupportedStoreUrl { url: String },
}

/// Errors from the shared key-value store.
///
/// None of these are retried automatically.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store operation '{operation}' timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("Store operation '{operation}' failed: {reason}")]
    Backend {
        operation: &'static str,
        reason: String,
    },
}

/// Failure reported by an external fetcher during a cache miss or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source may succeed if asked again later.
    #[error("transient fetch failure: {reason}")]
    Transient { reason: String },

    /// The source will not succeed for this key.
    #[error("permanent fetch failure: {reason}")]
    Permanent { reason: String },
}

impl FetchError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent {
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Outcome of a rejected confirm attempt.
///
/// Every variant is terminal for that attempt; the manager never retries.
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("No proposal found with id '{proposal_id}'")]
    NotFound { proposal_id: ProposalId },

    #[error("Proposal '{proposal_id}' has expired")]
    Expired { proposal_id: ProposalId },

    #[error("Proposal '{proposal_id}' has already been confirmed")]
    AlreadyConsumed { proposal_id: ProposalId },

    #[error("Confirmation token does not match proposal '{proposal_id}'")]
    TokenMismatch { proposal_id: ProposalId },

    #[error("Store error during confirmation: {0}")]
    Store(#[from] StoreError),
}

impl ConfirmError {
    /// Short machine-readable outcome tag, used for audit and metrics labels.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Expired { .. } => "expired",
            Self::AlreadyConsumed { .. } => "already_consumed",
            Self::TokenMismatch { .. } => "token_mismatch",
            Self::Store(_) => "store_error",
        }
    }

    /// Wording suitable for showing to the person who asked for the action.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => {
                "No pending confirmation was found. It may have expired or never existed; please request the deletion again."
            }
            Self::Expired { .. } => {
                "This confirmation has expired. Please request the deletion again."
            }
            Self::AlreadyConsumed { .. } => {
                "This deletion was already confirmed. Each confirmation can only be used once."
            }
            Self::TokenMismatch { .. } => {
                "The confirmation token does not match. Use the exact token returned when the deletion was proposed."
            }
            Self::Store(_) => {
                "The confirmation service is temporarily unavailable. Nothing was deleted."
            }
        }
    }
}

/// Result type alias using GateError.
pub type GateResult<T> = Result<T, GateError>;

/// Result type alias for store adapter calls.
pub type StoreResult<T> = Result<T, StoreError>;
