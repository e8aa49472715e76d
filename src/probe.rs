use std::net::SocketAddr;

use tokio::net::{self, TcpStream};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify::{self, ConnectFailure, ECANCELED};
use crate::types::{ProbeRequest, ProbeResult, ProbeStatus};

/// Probe one host:port with a TCP connect.
///
/// - Name resolution and connect share a single `tokio::time::timeout`.
/// - A successful connection is closed right away; nothing is sent or read.
/// - Network failures never surface as `Err`; they are classified into the result.
pub async fn probe_port(req: &ProbeRequest) -> ProbeResult {
    probe_port_with_cancel(req, CancellationToken::new()).await
}

/// Variant that abandons the attempt when `cancel` fires. The in-flight socket is
/// dropped and the result is `error` with code `ECANCELED`.
pub async fn probe_port_with_cancel(req: &ProbeRequest, cancel: CancellationToken) -> ProbeResult {
    let start = Instant::now();

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        res = time::timeout(req.timeout(), connect(req.host(), req.port())) => Some(res),
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let (status, error) = match outcome {
        None => (ProbeStatus::Error, Some(ECANCELED.to_string())),
        Some(Ok(Ok(stream))) => {
            drop(stream);
            (ProbeStatus::Open, None)
        }
        Some(Ok(Err(failure))) => {
            let (status, code) = classify::classify(&failure);
            debug!(host = req.host(), port = req.port(), ?failure, "connect failed");
            (status, Some(code))
        }
        Some(Err(_elapsed)) => (ProbeStatus::Timeout, None),
    };

    debug!(
        host = req.host(),
        port = req.port(),
        %status,
        latency_ms = elapsed_ms,
        "probe finished"
    );
    ProbeResult::new(req.host(), req.port(), status, elapsed_ms, error)
}

/// Resolve `host` and try each address in turn, keeping the last connect error.
async fn connect(host: &str, port: u16) -> Result<TcpStream, ConnectFailure> {
    let addrs: Vec<SocketAddr> = net::lookup_host((host, port))
        .await
        .map_err(|e| ConnectFailure::Resolve(Some(e)))?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => ConnectFailure::Connect(e),
        None => ConnectFailure::Resolve(None),
    })
}
