// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
mod cli;

use std::io::Read;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use relay_core::{ChatCompletionRequest, CoreBuilder, IncomingMessage};
use relay_provider::{EchoChat, MockEmbedding, Role};
use relay_retrieval::MemoryVectorStore;
use relay_store::{Plan, User};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::ShowConfig => {
            let config = relay_config::load(cli.config.as_deref())?;
            println!("{}", serde_yaml_string(&config));
            Ok(())
        }
        Commands::ListModels { provider, json } => list_models(provider.as_deref(), *json),
        Commands::ListProviders { json } => list_providers(*json),
        Commands::Chat {
            prompt,
            model,
            provider,
            rag,
            json,
        } => {
            let config = relay_config::load(cli.config.as_deref())?;
            run_chat(
                config,
                prompt.clone(),
                model.clone(),
                provider.clone(),
                *rag,
                *json,
            )
            .await
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RELAY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn serde_yaml_string<T: serde::Serialize>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

fn list_models(provider: Option<&str>, json: bool) -> anyhow::Result<()> {
    let models: Vec<_> = relay_catalog::static_catalog()
        .iter()
        .filter(|m| provider.map_or(true, |p| m.provider == p))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }
    for m in models {
        println!(
            "{:<24} {:<12} ctx {:>8}  in ${:<9} out ${:<9} {}",
            m.matching_model,
            m.provider,
            m.context_window,
            m.cost_per_1k_input_tokens,
            m.cost_per_1k_output_tokens,
            if m.included_in_router { "router" } else { "" },
        );
    }
    Ok(())
}

fn list_providers(json: bool) -> anyhow::Result<()> {
    if json {
        let rows: Vec<serde_json::Value> = relay_provider::list_drivers()
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "name": d.name,
                    "description": d.description,
                    "capabilities": d.capabilities.iter().map(|c| format!("{c:?}")).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for d in relay_provider::list_drivers() {
        println!("{:<12} {:<22} {}", d.id, d.name, d.description);
    }
    Ok(())
}

async fn run_chat(
    config: relay_config::Config,
    prompt: Option<String>,
    model: Option<String>,
    provider: Option<String>,
    rag: bool,
    json: bool,
) -> anyhow::Result<()> {
    let prompt = match prompt {
        Some(p) => p,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer.trim().to_string()
        }
    };
    if prompt.is_empty() {
        anyhow::bail!("empty prompt");
    }

    // The CLI runs the full pipeline in-process: memory store, memory
    // vector index, and the mock chat layer unless real providers are
    // configured.
    let mut builder = CoreBuilder::new(config.clone())
        .retrieval(Arc::new(MemoryVectorStore::new(Arc::new(MockEmbedding))));
    if config.providers.default_chat == "mock" {
        builder = builder.chat_provider(Arc::new(EchoChat)).auxiliary(Arc::new(EchoChat));
    }
    let core = builder.build();

    let user = User::new(1, "cli@localhost", Plan::Pro);
    let request = ChatCompletionRequest {
        completion_id: uuid::Uuid::new_v4().to_string(),
        model,
        provider,
        messages: vec![IncomingMessage {
            role: Role::User,
            content: prompt,
            tool_call_id: None,
            name: None,
        }],
        user: Some(user),
        use_rag: rag,
        store: false,
        ..ChatCompletionRequest::default()
    };

    let response = core.complete(request).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("[{}] {}", response.selected_model, response.response.content);
    }
    Ok(())
}
