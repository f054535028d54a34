//! runbox - sandboxed code execution service.
//!
//! Accepts one binary invocation request per WebSocket connection, runs the
//! submitted program under an external sandbox helper, and returns the
//! captured output and resource accounting in a single binary response.

mod error;
mod fingerprint;
mod languages;
mod protocol;
mod sandbox;
mod server;
mod state;
mod workspace;

use clap::Parser;
use state::{AppState, Config};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "runbox")]
#[command(about = "Sandboxed code execution service")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:4568")]
    addr: SocketAddr,

    /// Directory that per-invocation workspaces are created under
    #[arg(long, default_value = "/run/runbox")]
    workspace_root: PathBuf,

    /// Path to the sandbox helper executable
    #[arg(long, default_value = "/usr/local/bin/runbox-sandbox")]
    sandbox_helper: PathBuf,

    /// Trust the X-Real-IP header set by a fronting proxy
    #[arg(long)]
    trust_proxy_header: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let state = AppState::new(Config {
        workspace_root: args.workspace_root,
        helper_path: args.sandbox_helper,
        trust_proxy_header: args.trust_proxy_header,
    });

    // serve only returns when the listener is gone, which is always fatal
    match server::serve(args.addr, state).await {
        Ok(()) => error!("listener terminated"),
        Err(e) => error!("listener terminated: {e}"),
    }
    std::process::exit(1);
}
