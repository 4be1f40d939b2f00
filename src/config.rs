/// Gateway Configuration
///
/// Centralizes the gateway's environment variables into one typed struct
/// built once at startup, rather than scattering `env::var` calls across
/// handlers.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-chat-gateway")]
pub struct Cli {
    /// Transport mode: "stdio" or "http"
    #[arg(long, env = "MCP_TRANSPORT_MODE", default_value = "stdio")]
    pub transport: String,

    /// Bind address for HTTP mode
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port number for HTTP mode
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Server name reported in `initialize` responses
    #[arg(long, env = "SERVER_NAME", default_value = "mcp-chat-gateway")]
    pub server_name: String,

    /// Server version reported in `initialize` responses
    #[arg(long, env = "SERVER_VERSION", default_value = "0.1.0")]
    pub server_version: String,
}

/// Fully resolved settings consumed by the gateway's components.
///
/// Constructed once in `main` and passed down explicitly; no component reads
/// `std::env` directly after startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_name: String,
    pub server_version: String,
    pub transport: String,
    pub host: String,
    pub port: u16,

    /// Require a known `sessionId` on `tools/call` (strict mode) instead of
    /// auto-creating one on first use (lenient mode).
    pub require_session: bool,

    pub openai_api_key: Option<String>,
    pub openai_base_url: String,

    pub poll_delay_secs: u64,
    pub max_polls: u32,
    pub max_poll_concurrency: usize,
    pub max_turns: u32,

    pub think_tool_enabled: bool,
    pub think_tool_url: Option<String>,
    pub think_tool_timeout_ms: u64,
    pub think_tool_retry_limit: u32,

    pub langsmith_tracing: bool,
    pub langsmith_project: Option<String>,
    pub langsmith_api_key: Option<String>,
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            server_name: cli.server_name,
            server_version: cli.server_version,
            transport: cli.transport,
            host: cli.host,
            port: cli.port,

            require_session: env_flag("MCP_REQUIRE_SESSION"),

            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),

            poll_delay_secs: env_or("POLL_DELAY", 1),
            max_polls: env_or("MAX_POLLS", 60),
            max_poll_concurrency: env_or("RESPONSES_POLL_MAX_CONCURRENCY", 8usize),
            max_turns: env_or("MAX_TURNS", 15),

            think_tool_enabled: env_flag("THINK_TOOL_ENABLED"),
            think_tool_url: std::env::var("THINK_TOOL_URL").ok(),
            think_tool_timeout_ms: env_or("THINK_TOOL_TIMEOUT_MS", 30_000),
            think_tool_retry_limit: env_or("THINK_TOOL_RETRY_LIMIT", 2),

            langsmith_tracing: env_flag("LANGSMITH_TRACING"),
            langsmith_project: std::env::var("LANGSMITH_PROJECT").ok(),
            langsmith_api_key: std::env::var("LANGSMITH_API_KEY").ok(),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_name: "mcp-chat-gateway".into(),
            server_version: "0.0.0-test".into(),
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 0,
            require_session: false,
            openai_api_key: Some("test-key".into()),
            openai_base_url: "http://127.0.0.1:0".into(),
            poll_delay_secs: 0,
            max_polls: 60,
            max_poll_concurrency: 8,
            max_turns: 15,
            think_tool_enabled: true,
            think_tool_url: Some("http://127.0.0.1:0".into()),
            think_tool_timeout_ms: 1000,
            think_tool_retry_limit: 1,
            langsmith_tracing: false,
            langsmith_project: None,
            langsmith_api_key: None,
        }
    }
}
