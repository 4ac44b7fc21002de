// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Recordgate CLI
//!
//! Operator interface for the recordgate cache and propose/confirm gate.

use clap::{Parser, Subcommand};

mod commands;

/// Recordgate - shared cache and confirmation gate for record APIs
#[derive(Parser)]
#[command(name = "rgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "recordgate.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print this run's Prometheus counters to stderr when the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (defaults to --config)
        file: Option<String>,
    },

    /// Check that the shared store is reachable
    Ping,

    /// Drop a cached entry, or every entry in a namespace
    Invalidate {
        /// Cache namespace: identity, schema or table-list
        namespace: String,

        /// Entry key; omit to clear the whole namespace
        key: Option<String>,
    },

    /// List the keys cached in a namespace
    Keys {
        /// Cache namespace: identity, schema or table-list
        namespace: String,
    },

    /// Propose deleting a record and print the one-time token
    Propose {
        /// Table the record belongs to
        #[arg(short, long)]
        table: String,

        /// Record identifier
        #[arg(short, long)]
        record: String,

        /// Impact summary shown before confirmation
        #[arg(short, long)]
        summary: Option<String>,

        /// Print the receipt as JSON
        #[arg(long)]
        json: bool,
    },

    /// Confirm a proposal with its token
    Confirm {
        /// Proposal ID returned by propose
        proposal_id: String,

        /// One-time token returned by propose
        token: String,
    },

    /// Show the status of a proposal
    Status {
        /// Proposal ID returned by propose
        proposal_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    // Dispatch to command handlers
    let result = match cli.command {
        Commands::Validate { file } => {
            commands::validate::execute(file.as_deref().unwrap_or(&cli.config)).await
        }
        Commands::Ping => commands::ping::execute(&cli.config).await,
        Commands::Invalidate { namespace, key } => {
            commands::invalidate::execute(&cli.config, &namespace, key.as_deref()).await
        }
        Commands::Keys { namespace } => commands::keys::execute(&cli.config, &namespace).await,
        Commands::Propose {
            table,
            record,
            summary,
            json,
        } => commands::propose::execute(&cli.config, &table, &record, summary, json).await,
        Commands::Confirm { proposal_id, token } => {
            commands::confirm::execute(&cli.config, &proposal_id, &token).await
        }
        Commands::Status { proposal_id } => {
            commands::status::execute(&cli.config, &proposal_id).await
        }
    };

    if cli.metrics {
        eprint!("{}", recordgate_core::metrics::render());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_metrics_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["rgate", "status", "x", "--metrics"]).unwrap();
        assert!(cli.metrics);
        assert!(matches!(cli.command, Commands::Status { .. }));

        let cli = Cli::try_parse_from(["rgate", "ping"]).unwrap();
        assert!(!cli.metrics);
    }

    #[test]
    fn test_rendered_metrics_after_proposal() {
        recordgate_core::metrics::record_proposal_created("delete_record");
        let text = recordgate_core::metrics::render();
        assert!(text.contains("recordgate_proposals_created_total"));
    }
}
