// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `rgate validate` command - Validate configuration file.

use recordgate_core::ConfigLoader;

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Store:");
            println!("  Backend:            {:?}", config.store.backend);
            println!("  Key Prefix:         {}", config.store.key_prefix);
            println!(
                "  Operation Timeout:  {}ms",
                config.store.op_timeout.as_millis()
            );
            println!();
            println!("Cache TTLs:");
            println!(
                "  Identity:           {}s",
                config.cache.identity_ttl.as_secs()
            );
            let schema_ttl = config.cache.schema_ttl.as_secs();
            if schema_ttl == 0 {
                println!("  Schema:             disabled");
            } else {
                println!("  Schema:             {}s", schema_ttl);
            }
            println!(
                "  Table List:         {}s",
                config.cache.table_list_ttl.as_secs()
            );
            println!(
                "  Fetch Timeout:      {}ms",
                config.cache.fetch_timeout.as_millis()
            );
            println!();
            println!("Proposals:");
            println!(
                "  Confirm Token TTL:  {}s",
                config.proposals.confirm_token_ttl.as_secs()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
