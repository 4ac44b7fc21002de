// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `rgate keys` command - List what a cache namespace currently holds.

pub async fn execute(config_path: &str, namespace: &str) -> Result<(), Box<dyn std::error::Error>> {
    let namespace = super::parse_namespace(namespace)?;
    let broker = super::connect(config_path).await?;

    let keys = broker.cache().cached_keys(namespace).await?;
    if keys.is_empty() {
        println!("Nothing cached in {}.", namespace);
        return Ok(());
    }

    for key in &keys {
        println!("  - {}", key);
    }
    println!();
    println!("Total: {} key(s) in {}", keys.len(), namespace);
    Ok(())
}
