//! HTTP server: the execute endpoint and the metadata endpoint.
//!
//! `/api/v0/ws/execute` is strictly one binary request frame in, one binary
//! result frame out, then a close whose code and reason classify the outcome.

use crate::error as error_mod;
use crate::languages::{self, Language};
use crate::protocol::{
    self, InvocationRequest, InvocationResult, MAX_REQUEST_BYTES, MAX_TIMEOUT_SECS,
};
use crate::sandbox;
use crate::state::AppState;
use crate::workspace::Workspace;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::Router;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

/// Deadline for writing the final close frame.
const CLOSE_WRITE_DEADLINE: Duration = Duration::from_secs(1);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v0/metadata", get(metadata))
        .route("/api/v0/ws/execute", get(execute))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the listener and serves until it terminates, which is always fatal
/// for the process.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).await
}

async fn metadata() -> Vec<u8> {
    languages::catalog().to_vec()
}

async fn execute(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_execute(socket, state, peer, headers))
}

/// Terminal outcomes for one connection, each carrying its close code and
/// reason from the endpoint contract.
enum Reject {
    /// Transport gone or client closed first; nothing left to say.
    Gone,
    UnsupportedData,
    TooLarge,
    BadRequest(String),
    NullByte,
    NoSuchLanguage,
    BadTimeout,
    Internal,
}

impl Reject {
    fn close_frame(self) -> Option<(u16, String)> {
        match self {
            Reject::Gone => None,
            Reject::UnsupportedData => {
                Some((close_code::UNSUPPORTED, "unexpected message type".into()))
            }
            Reject::TooLarge => Some((close_code::SIZE, "request too large".into())),
            Reject::BadRequest(detail) => {
                Some((close_code::POLICY, format!("bad request: {detail}")))
            }
            Reject::NullByte => {
                Some((close_code::POLICY, "argument contains null byte".into()))
            }
            Reject::NoSuchLanguage => Some((close_code::POLICY, "no such language".into())),
            Reject::BadTimeout => {
                Some((close_code::POLICY, "timeout not in range (0, 60]".into()))
            }
            Reject::Internal => Some((close_code::ERROR, "internal error".into())),
        }
    }
}

async fn handle_execute(
    mut socket: WebSocket,
    state: AppState,
    peer: SocketAddr,
    headers: HeaderMap,
) {
    let frame = match serve_invocation(&mut socket, &state, peer, &headers).await {
        Ok(()) => Some((close_code::NORMAL, String::from("success"))),
        Err(reject) => reject.close_frame(),
    };
    if let Some((code, reason)) = frame {
        close(&mut socket, code, reason).await;
    }
}

async fn serve_invocation(
    socket: &mut WebSocket,
    state: &AppState,
    peer: SocketAddr,
    headers: &HeaderMap,
) -> Result<(), Reject> {
    let frame = read_request_frame(socket).await?;
    if frame.len() > MAX_REQUEST_BYTES {
        warn!(size = frame.len(), "request too large");
        return Err(Reject::TooLarge);
    }
    let request: InvocationRequest = protocol::decode(&frame).map_err(|e| {
        warn!(error = %e, "undecodable request");
        Reject::BadRequest(e.to_string())
    })?;
    let language = validate(&request)?;

    let ip = client_ip(headers, peer, state.config.trust_proxy_header);
    let client = state.fingerprinter.fingerprint(&ip);
    info!(
        client = %client,
        language = %request.language,
        timeout = request.timeout,
        "invoking"
    );

    let result = invoke(state, &request, language).await.map_err(|e| {
        error!(error = %e, "invocation failed");
        Reject::Internal
    })?;
    let encoded = protocol::encode(&result).map_err(|e| {
        error!(error = %e, "failed to encode result");
        Reject::Internal
    })?;
    if let Err(e) = socket.send(Message::Binary(encoded)).await {
        // the child already ran; the result is simply discarded
        info!(error = %e, "client went away before the result was delivered");
        return Err(Reject::Gone);
    }
    Ok(())
}

/// Waits for the single request frame. Control frames are not data and are
/// skipped; a text frame is a protocol violation.
async fn read_request_frame(socket: &mut WebSocket) -> Result<Vec<u8>, Reject> {
    loop {
        match socket.recv().await {
            None => return Err(Reject::Gone),
            Some(Err(e)) => {
                debug!(error = %e, "transport error while waiting for request");
                return Err(Reject::Gone);
            }
            Some(Ok(Message::Binary(data))) => return Ok(data),
            Some(Ok(Message::Close(_))) => return Err(Reject::Gone),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Text(_))) => {
                warn!("unexpected message type");
                return Err(Reject::UnsupportedData);
            }
        }
    }
}

fn validate(request: &InvocationRequest) -> Result<&'static Language, Reject> {
    for arg in request.arguments.iter().chain(request.options.iter()) {
        if arg.contains(&0) {
            warn!("argument contains null byte");
            return Err(Reject::NullByte);
        }
    }
    let Some(language) = languages::lookup(&request.language) else {
        warn!(language = %request.language, "no such language");
        return Err(Reject::NoSuchLanguage);
    };
    if request.timeout <= 0 || request.timeout > MAX_TIMEOUT_SECS {
        warn!(timeout = request.timeout, "timeout out of range");
        return Err(Reject::BadTimeout);
    }
    Ok(language)
}

/// The client IP used for fingerprinting: a trusted proxy's `X-Real-IP` if
/// configured, otherwise the peer address with the port stripped.
fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_proxy_header: bool) -> String {
    if trust_proxy_header {
        if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            return ip.to_string();
        }
        warn!("X-Real-IP missing on a deployment that trusts it");
    }
    peer.ip().to_string()
}

/// Runs the full pipeline for one validated request. The workspace is
/// removed on every exit path.
async fn invoke(
    state: &AppState,
    request: &InvocationRequest,
    language: &'static Language,
) -> error_mod::Result<InvocationResult> {
    let workspace = Workspace::create(&state.config.workspace_root, request).await?;
    let result = sandbox::run(
        &state.config,
        &workspace,
        &request.language,
        language.image,
        request.timeout,
    )
    .await;
    workspace.remove().await;
    result
}

/// Writes the close frame under a short deadline, then lets the transport
/// drop either way.
async fn close(socket: &mut WebSocket, code: u16, reason: String) {
    let frame = CloseFrame {
        code,
        reason: Cow::Owned(reason),
    };
    match tokio::time::timeout(CLOSE_WRITE_DEADLINE, socket.send(Message::Close(Some(frame))))
        .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "close write failed"),
        Err(_) => debug!("close write timed out"),
    }
}
