// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `rgate confirm` command - Consume a proposal token.

use recordgate_core::ProposalId;

pub async fn execute(
    config_path: &str,
    proposal_id: &str,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let proposal_id = ProposalId::parse(proposal_id)?;
    let broker = super::connect(config_path).await?;

    match broker.proposals().confirm(&proposal_id, token).await {
        Ok(target) => {
            println!("✓ Confirmed. Authorized to delete {}", target);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            eprintln!("  ({})", e);
            std::process::exit(1);
        }
    }
}
