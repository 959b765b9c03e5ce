// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "relay",
    about = "Chat completion core for a multi-tenant AI assistant backend",
    version
)]
pub struct Cli {
    /// Explicit config file (merged over the discovered layers).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging to stderr (RELAY_LOG overrides the filter).
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single chat turn through the full pipeline and print the reply.
    Chat {
        /// The user prompt. Reads stdin when omitted.
        prompt: Option<String>,
        /// Explicit model (bypasses the router).
        #[arg(long, short = 'm')]
        model: Option<String>,
        /// Explicit provider (used when no model is given).
        #[arg(long, short = 'p')]
        provider: Option<String>,
        /// Rewrite the prompt with retrieved context first.
        #[arg(long)]
        rag: bool,
        /// Print the full response JSON instead of just the text.
        #[arg(long)]
        json: bool,
    },

    /// List the model catalog.
    ListModels {
        /// Restrict to one provider id.
        #[arg(long)]
        provider: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List registered providers and their capabilities.
    ListProviders {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the merged configuration and exit.
    ShowConfig,
}
