// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `rgate invalidate` command - Drop one cache entry or a whole namespace.

pub async fn execute(
    config_path: &str,
    namespace: &str,
    key: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespace = super::parse_namespace(namespace)?;
    let broker = super::connect(config_path).await?;

    match key {
        Some(key) => {
            if broker.cache().invalidate(namespace, key).await? {
                println!("✓ Removed {}:{}", namespace, key);
            } else {
                println!("No cached entry for {}:{}", namespace, key);
            }
        }
        None => {
            let removed = broker.cache().invalidate_namespace(namespace).await?;
            println!("✓ Removed {} entr(y/ies) from {}", removed, namespace);
        }
    }
    Ok(())
}
