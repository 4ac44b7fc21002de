//! Recordgate Core Library
//!
//! Shared read-through cache and propose/confirm safety gate for agents
//! driving a remote record-management API. All state lives in a shared
//! key-value store so any number of stateless replicas can serve requests.

pub mod audit;
pub mod broker;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod proposal;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use audit::{AuditEvent, AuditSink, CollectingAuditSink, TracingAuditSink};
pub use broker::Broker;
pub use cache::{CacheManager, CacheNamespace, CachePolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, Config, ConfigLoader, ProposalConfig, StoreConfig};
pub use error::{
    ConfirmError, FetchError, GateError, GateResult, HardValidationError, StoreError, StoreResult,
};
pub use keys::KeyLayout;
pub use proposal::{
    Operation, ProposalManager, ProposalReceipt, ProposalRecord, ProposalStatus, Target,
};
pub use store::{KvStore, MemoryStore, RedisStore};
pub use types::{Principal, ProposalId, RecordId, TableName};
