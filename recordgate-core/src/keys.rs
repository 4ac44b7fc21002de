// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Store key layout.
//!
//! `<prefix>:cache:<namespace>:<key>` for cache entries and
//! `<prefix>:proposal:<proposal_id>` for proposals. Every replica must agree
//! on this layout since the store is the only shared state.

use crate::cache::CacheNamespace;
use crate::types::ProposalId;

/// Builds namespaced store keys under a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    prefix: String,
}

impl KeyLayout {
    /// The prefix is validated by the config loader.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn cache_key(&self, namespace: CacheNamespace, key: &str) -> String {
        format!("{}:cache:{}:{}", self.prefix, namespace.tag(), key)
    }

    /// Prefix shared by every entry of one cache namespace.
    pub fn cache_namespace_prefix(&self, namespace: CacheNamespace) -> String {
        format!("{}:cache:{}:", self.prefix, namespace.tag())
    }

    pub fn proposal_key(&self, id: &ProposalId) -> String {
        format!("{}:proposal:{}", self.prefix, id)
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new("mcp")
    }
}
