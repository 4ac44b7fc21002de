// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod confirm;
pub mod invalidate;
pub mod keys;
pub mod ping;
pub mod propose;
pub mod status;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use recordgate_core::{Broker, CacheNamespace, Config, ConfigLoader, GateResult, TracingAuditSink};

/// Load the configuration file, or fall back to defaults plus environment
/// overrides when the file does not exist.
pub fn load_config(config_path: &str) -> GateResult<Config> {
    if Path::new(config_path).exists() {
        ConfigLoader::load_file(config_path)
    } else {
        tracing::debug!(
            path = %config_path,
            "Configuration file not found, using defaults and environment"
        );
        ConfigLoader::from_env()
    }
}

pub async fn connect(config_path: &str) -> GateResult<Broker> {
    let config = load_config(config_path)?;
    Broker::connect(&config, Arc::new(TracingAuditSink)).await
}

pub fn parse_namespace(tag: &str) -> Result<CacheNamespace, String> {
    CacheNamespace::from_tag(tag).ok_or_else(|| {
        let known: Vec<_> = CacheNamespace::ALL.iter().map(|ns| ns.tag()).collect();
        format!("unknown namespace '{}' (expected one of: {})", tag, known.join(", "))
    })
}
