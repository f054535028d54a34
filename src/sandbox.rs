//! Driver for the external sandbox helper.
//!
//! The helper is trusted to enforce isolation, resource limits and the
//! wall-clock timeout; this module only spawns it, captures its streams and
//! reads back the status report it writes into the workspace.

use crate::error::{Error, Result};
use crate::protocol::{InvocationResult, StatusReport, MAX_STDERR_BYTES, MAX_STDOUT_BYTES};
use crate::state::Config;
use crate::workspace::Workspace;
use serde_bytes::ByteBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

struct Capture {
    data: Vec<u8>,
    truncated: bool,
}

/// Runs one invocation under the sandbox helper.
///
/// The helper receives `[raw_id, language_id, timeout, image]` and an
/// environment reduced to `PATH`; its stdin is empty. Timeout enforcement is
/// the helper's job, so the driver simply waits for it to exit.
pub async fn run(
    config: &Config,
    workspace: &Workspace,
    language_id: &str,
    image: &str,
    timeout: i64,
) -> Result<InvocationResult> {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let mut child = Command::new(&config.helper_path)
        .arg(workspace.raw_id())
        .arg(language_id)
        .arg(timeout.to_string())
        .arg(image)
        .env_clear()
        .env("PATH", path_var)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(Error::Spawn)?;

    let stdout = child.stdout.take().expect("stdout was requested piped");
    let stderr = child.stderr.take().expect("stderr was requested piped");
    let stdout_drainer = tokio::spawn(drain(stdout, MAX_STDOUT_BYTES));
    let stderr_drainer = tokio::spawn(drain(stderr, MAX_STDERR_BYTES));

    let stdout = stdout_drainer
        .await
        .map_err(Error::Drainer)?
        .map_err(Error::Capture)?;
    let stderr = stderr_drainer
        .await
        .map_err(Error::Drainer)?
        .map_err(Error::Capture)?;
    let exit = child.wait().await.map_err(Error::Wait)?;
    if !exit.success() {
        warn!(status = %exit, "sandbox helper exited unsuccessfully");
    }

    let encoded = tokio::fs::read(workspace.path().join("status"))
        .await
        .map_err(Error::Status)?;
    let status: StatusReport = serde_json::from_slice(&encoded).map_err(Error::StatusParse)?;
    debug!(
        status_type = %status.status_type,
        status_value = status.status_value,
        timed_out = status.timed_out,
        real = status.real,
        "invocation finished"
    );

    Ok(InvocationResult {
        stdout: ByteBuf::from(stdout.data),
        stderr: ByteBuf::from(stderr.data),
        stdout_truncated: stdout.truncated,
        stderr_truncated: stderr.truncated,
        status_type: status.status_type,
        status_value: status.status_value,
        timed_out: status.timed_out,
        real: status.real,
        kernel: status.kernel,
        user: status.user,
        max_mem: status.max_mem,
        waits: status.waits,
        preemptions: status.preemptions,
        minor_page_faults: status.minor_page_faults,
        major_page_faults: status.major_page_faults,
        input_ops: status.input_ops,
        output_ops: status.output_ops,
    })
}

/// Reads a child stream to EOF, keeping at most `cap` bytes. Bytes past the
/// cap are read and discarded so the child never blocks on a full pipe.
async fn drain<R: AsyncRead + Unpin>(mut stream: R, cap: usize) -> std::io::Result<Capture> {
    let mut data = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap - data.len();
        if n <= room {
            data.extend_from_slice(&chunk[..n]);
        } else {
            data.extend_from_slice(&chunk[..room]);
            truncated = true;
        }
    }
    Ok(Capture { data, truncated })
}
