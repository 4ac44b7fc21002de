// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `rgate status` command - Show whether a proposal is pending or consumed.

use recordgate_core::ProposalId;

pub async fn execute(config_path: &str, proposal_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let proposal_id = ProposalId::parse(proposal_id)?;
    let broker = super::connect(config_path).await?;

    match broker.proposals().status(&proposal_id).await? {
        Some(status) => println!("{}: {}", proposal_id, status),
        None => println!("{}: not found (expired or never created)", proposal_id),
    }
    Ok(())
}
