// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Prometheus counters for cache lookups and proposal outcomes.

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

use crate::cache::CacheNamespace;

lazy_static! {
    pub static ref CACHE_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "recordgate_cache_lookups_total",
        "Cache lookups by namespace and outcome (hit, miss, bypass, refresh)",
        &["namespace", "outcome"]
    )
    .unwrap();
    pub static ref PROPOSALS_CREATED: IntCounterVec = register_int_counter_vec!(
        "recordgate_proposals_created_total",
        "Destructive-action proposals issued",
        &["operation"]
    )
    .unwrap();
    pub static ref CONFIRM_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "recordgate_confirm_outcomes_total",
        "Confirm attempts by outcome",
        &["outcome"]
    )
    .unwrap();
}

pub fn record_cache_lookup(namespace: CacheNamespace, outcome: &str) {
    CACHE_LOOKUPS
        .with_label_values(&[namespace.tag(), outcome])
        .inc();
}

pub fn record_proposal_created(operation: &str) {
    PROPOSALS_CREATED.with_label_values(&[operation]).inc();
}

pub fn record_confirm_outcome(outcome: &str) {
    CONFIRM_OUTCOMES.with_label_values(&[outcome]).inc();
}

/// Render every registered metric in the Prometheus text format.
pub fn render() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("Encoding error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let before = CONFIRM_OUTCOMES
            .with_label_values(&["token_mismatch"])
            .get();
        record_confirm_outcome("token_mismatch");
        let after = CONFIRM_OUTCOMES
            .with_label_values(&["token_mismatch"])
            .get();
        assert!(after > before);
    }

    #[test]
    fn test_render_contains_registered_metric() {
        record_cache_lookup(CacheNamespace::Schema, "hit");
        let text = render();
        assert!(text.contains("recordgate_cache_lookups_total"));
    }
}
