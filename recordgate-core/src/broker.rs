// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Wiring of store, cache and proposals from one configuration.

use std::sync::Arc;

use crate::audit::AuditSink;
use crate::cache::CacheManager;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::GateResult;
use crate::keys::KeyLayout;
use crate::proposal::ProposalManager;
use crate::store::{self, KvStore};

/// Cache and proposal managers sharing one store.
#[derive(Debug, Clone)]
pub struct Broker {
    store: Arc<dyn KvStore>,
    cache: CacheManager,
    proposals: ProposalManager,
}

impl Broker {
    /// Open the configured store and build both managers on top of it.
    pub async fn connect(config: &Config, audit: Arc<dyn AuditSink>) -> GateResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = store::connect(&config.store, clock.clone()).await?;
        tracing::info!(
            backend = store.backend_name(),
            key_prefix = %config.store.key_prefix,
            "Broker ready"
        );
        Ok(Self::from_parts(config, store, clock, audit))
    }

    /// Build on an already opened store.
    pub fn from_parts(
        config: &Config,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let layout = KeyLayout::new(config.store.key_prefix.clone());
        let cache = CacheManager::new(store.clone(), layout.clone(), &config.cache);
        let proposals = ProposalManager::new(store.clone(), layout, &config.proposals, clock, audit);
        Self {
            store,
            cache,
            proposals,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn proposals(&self) -> &ProposalManager {
        &self.proposals
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CollectingAuditSink;
    use crate::config::ConfigLoader;

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = ConfigLoader::load_string("store:\n  url: memory://\n").unwrap();
        let broker = Broker::connect(&config, Arc::new(CollectingAuditSink::new()))
            .await
            .unwrap();
        assert_eq!(broker.store().backend_name(), "memory");
        assert!(broker.store().ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_managers_share_prefix() {
        let config =
            ConfigLoader::load_string("store:\n  url: memory://\n  key_prefix: gate\n").unwrap();
        let broker = Broker::connect(&config, Arc::new(CollectingAuditSink::new()))
            .await
            .unwrap();

        let _: Vec<String> = broker
            .cache()
            .table_list(|| async { Ok(vec!["contact".to_string()]) })
            .await
            .unwrap();

        let keys = broker.store().keys_with_prefix("gate:").await.unwrap();
        assert_eq!(keys, vec!["gate:cache:table-list:all".to_string()]);
    }
}
