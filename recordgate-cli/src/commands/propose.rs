// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `rgate propose` command - Request a record deletion.
//!
//! Prints the one-time token. It is not stored anywhere and cannot be shown
//! again.

use recordgate_core::{Operation, RecordId, TableName, Target};

pub async fn execute(
    config_path: &str,
    table: &str,
    record: &str,
    summary: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = Target::new(TableName::new(table)?, RecordId::new(record)?);
    let broker = super::connect(config_path).await?;

    let operation = Operation::DeleteRecord;
    let summary = summary.unwrap_or_else(|| operation.describe(&target));
    let receipt = broker
        .proposals()
        .propose(operation, target, summary)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
        return Ok(());
    }

    println!("{}", receipt.impact_summary);
    println!();
    println!("  Proposal ID:  {}", receipt.proposal_id);
    println!("  Token:        {}", receipt.token);
    println!("  Expires At:   {}", receipt.expires_at.to_rfc3339());
    println!();
    println!(
        "Run `rgate confirm {} <token>` before it expires to authorize.",
        receipt.proposal_id
    );
    Ok(())
}
