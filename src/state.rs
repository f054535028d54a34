//! Shared application state.

use crate::fingerprint::IpFingerprinter;
use std::path::PathBuf;
use std::sync::Arc;

/// Service configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that per-invocation workspaces are created under.
    pub workspace_root: PathBuf,
    /// Path to the sandbox helper executable.
    pub helper_path: PathBuf,
    /// Whether a fronting proxy's `X-Real-IP` header is authoritative.
    pub trust_proxy_header: bool,
}

/// Process-wide immutable state shared by all connections.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fingerprinter: Arc<IpFingerprinter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            fingerprinter: Arc::new(IpFingerprinter::new()),
        }
    }
}
