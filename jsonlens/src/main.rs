//! Terminal viewer binary.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jsonlens::session::{RetrievalEvent, ViewerSession, retrieve};
use jsonlens::surface::TerminalSurface;

/// Fetch a JSON document through the jsonlens proxy and display it.
///
/// The document goes to stdout; status and progress go to stderr.
#[derive(Debug, Parser)]
#[command(name = "jsonlens", version, about)]
struct Cli {
    /// Document URL to retrieve (must be allow-listed on the proxy).
    url: String,

    /// Base URL of the proxy.
    #[arg(long, env = "JSONLENS_PROXY", default_value = "http://127.0.0.1:4000")]
    proxy: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut session = ViewerSession::new(TerminalSurface::default());
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();

    let id = session.begin(&cli.url);
    tokio::spawn(retrieve(
        reqwest::Client::new(),
        cli.proxy,
        cli.url,
        id,
        events_tx,
    ));

    let mut failed = false;
    while let Some((event_id, event)) = events_rx.recv().await {
        if event_id == id && matches!(event, RetrievalEvent::Failed(_)) {
            failed = true;
        }
        session.apply(event_id, event);
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
