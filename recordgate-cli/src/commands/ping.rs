// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `rgate ping` command - Check the shared store answers.

use std::time::Instant;

pub async fn execute(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let broker = super::connect(config_path).await?;

    let started = Instant::now();
    broker.store().ping().await?;
    let elapsed = started.elapsed();

    println!(
        "✓ {} store reachable ({:.2}ms)",
        broker.store().backend_name(),
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}
