//! Proxy server binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use jsonlens_core::ProxyConfig;

/// Streaming JSON retrieval proxy.
///
/// Fetches documents from allow-listed upstream hosts with injected
/// credentials and streams them back without buffering. All policy is
/// read from `JSONLENS_*` environment variables at startup; the flags
/// below override the bind address only.
#[derive(Debug, Parser)]
#[command(name = "jsonlens-proxy", version, about)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "JSONLENS_BIND_HOST")]
    bind: Option<String>,

    /// Port to bind.
    #[arg(short, long, env = "JSONLENS_PORT")]
    port: Option<u16>,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let mut config = ProxyConfig::from_env();
    if let Some(bind) = cli.bind {
        config.bind_host = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    if config.allowlist.is_empty() {
        warn!("allow-list is empty; every /api/fetch request will be refused");
    }

    if let Err(e) = jsonlens_proxy::server::run(config).await {
        error!(error = %e, "proxy terminated");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
