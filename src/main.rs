/// MCP Chat Gateway Entry Point
///
/// Parses CLI/env configuration, wires the provider adapter, poller, and
/// optional think client into a shared `AppContext`, registers tools, and
/// starts the selected transport.

mod config;
mod core;
mod error;
mod orchestrator;
mod provider;
mod think;
mod tools;
mod trace;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::Semaphore;

use crate::config::{Cli, Settings};
use crate::core::context::AppContext;
use crate::core::registry::ToolRegistry;
use crate::core::session::SessionRegistry;
use crate::provider::adapter::HttpProviderAdapter;
use crate::provider::poller::ResponsePoller;
use crate::think::client::HttpThinkClient;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_cli(cli);

    let ctx = match build_context(settings.clone()) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            tracing::error!(error = %e, "failed to start: invalid configuration");
            std::process::exit(1);
        }
    };

    let result = match settings.transport.as_str() {
        "stdio" => core::server::run_stdio(ctx).await,
        "http" => core::server::run_http(ctx, &settings.host, settings.port).await,
        other => {
            tracing::error!(transport = other, "invalid transport mode, must be 'stdio' or 'http'");
            std::process::exit(1);
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "server exited with error");
    }
    result
}

fn build_context(settings: Settings) -> Result<AppContext, String> {
    let api_key = settings
        .openai_api_key
        .clone()
        .ok_or_else(|| "OPENAI_API_KEY is required".to_string())?;

    let provider = Arc::new(HttpProviderAdapter::new(api_key, settings.openai_base_url.clone()));
    let semaphore = Arc::new(Semaphore::new(settings.max_poll_concurrency));
    let poller = Arc::new(ResponsePoller::new(
        semaphore,
        std::time::Duration::from_secs(settings.poll_delay_secs),
        settings.max_polls,
    ));

    let think_client: Option<Arc<dyn crate::think::client::ThinkClient>> =
        if settings.think_tool_enabled {
            let url = settings
                .think_tool_url
                .clone()
                .ok_or_else(|| "THINK_TOOL_URL is required when THINK_TOOL_ENABLED is set".to_string())?;
            Some(Arc::new(HttpThinkClient::new(
                url,
                settings.think_tool_timeout_ms,
                settings.think_tool_retry_limit,
            )))
        } else {
            None
        };

    let mut tools = ToolRegistry::new();
    crate::tools::echo::register(&mut tools);
    crate::tools::read_file::register(&mut tools);
    crate::tools::chat::register(&mut tools);
    if let Some(client) = &think_client {
        crate::tools::think::register(&mut tools, client.clone());
    }

    Ok(AppContext {
        sessions: SessionRegistry::new(settings.require_session),
        settings,
        tools,
        provider,
        poller,
        think_client,
    })
}
