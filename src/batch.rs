use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classify::{ECANCELED, EINTERNAL};
use crate::error::ProbeError;
use crate::probe;
use crate::types::{validate_host, ProbeRequest, ProbeResult, ProbeStatus};

/// Largest batch accepted by a single call.
pub const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProberConfig {
    /// Batches larger than this are rejected, never truncated.
    pub max_batch: usize,
    /// Upper bound on simultaneous connect attempts within one batch.
    pub max_in_flight: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            max_batch: MAX_BATCH,
            max_in_flight: MAX_BATCH,
        }
    }
}

/// Runs single probes and homogeneous batches (one host, one timeout, many ports).
#[derive(Debug, Clone, Default)]
pub struct Prober {
    config: ProberConfig,
}

impl Prober {
    pub fn new(config: ProberConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    pub async fn probe(&self, req: &ProbeRequest) -> ProbeResult {
        probe::probe_port(req).await
    }

    /// Probe every port of `ports` on `host` concurrently.
    ///
    /// Output has one result per input port, in input order.
    pub async fn probe_batch(
        &self,
        host: &str,
        ports: &[u16],
        timeout: Duration,
    ) -> Result<Vec<ProbeResult>, ProbeError> {
        self.probe_batch_with_cancel(host, ports, timeout, CancellationToken::new())
            .await
    }

    /// Variant that accepts a `CancellationToken` to abandon in-flight probes.
    /// Cancelled ports still get a result (`error` / `ECANCELED`).
    pub async fn probe_batch_with_cancel(
        &self,
        host: &str,
        ports: &[u16],
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Vec<ProbeResult>, ProbeError> {
        let requests = self.validate_batch(host, ports, timeout)?;
        Ok(self.run(requests, cancel).await)
    }

    /// Check every request up front so a rejected batch makes no network attempt.
    fn validate_batch(
        &self,
        host: &str,
        ports: &[u16],
        timeout: Duration,
    ) -> Result<Vec<ProbeRequest>, ProbeError> {
        let host = validate_host(host)?;
        if timeout.is_zero() {
            return Err(ProbeError::InvalidTimeout);
        }
        if ports.len() > self.config.max_batch {
            return Err(ProbeError::BatchTooLarge {
                requested: ports.len(),
                max: self.config.max_batch,
            });
        }
        ports
            .iter()
            .map(|&port| ProbeRequest::new(host.as_str(), port, timeout))
            .collect()
    }

    async fn run(&self, requests: Vec<ProbeRequest>, cancel: CancellationToken) -> Vec<ProbeResult> {
        let started = Instant::now();
        let sem = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut set = JoinSet::new();

        for (idx, req) in requests.iter().cloned().enumerate() {
            let sem = sem.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                // keep the permit until the probe resolves
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => None,
                    permit = sem.acquire_owned() => permit.ok(),
                };
                let result = if cancel.is_cancelled() {
                    ProbeResult::new(
                        req.host(),
                        req.port(),
                        ProbeStatus::Error,
                        0,
                        Some(ECANCELED.to_string()),
                    )
                } else {
                    probe::probe_port_with_cancel(&req, cancel).await
                };
                (idx, result)
            });
        }

        let mut slots: Vec<Option<ProbeResult>> = vec![None; requests.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => warn!(error = %e, "probe task failed"),
            }
        }

        let results = fill_slots(slots, &requests, started.elapsed().as_millis() as u64);

        let open = results.iter().filter(|r| r.is_open()).count();
        info!(
            host = requests.first().map(|r| r.host()).unwrap_or_default(),
            total = results.len(),
            open,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        results
    }
}

/// Pair collected results back with their requests. A task that panicked or was
/// aborted left its slot empty; it is reported as `EINTERNAL` for its own port only.
fn fill_slots(
    slots: Vec<Option<ProbeResult>>,
    requests: &[ProbeRequest],
    elapsed_ms: u64,
) -> Vec<ProbeResult> {
    slots
        .into_iter()
        .zip(requests)
        .map(|(slot, req)| {
            slot.unwrap_or_else(|| {
                ProbeResult::new(
                    req.host(),
                    req.port(),
                    ProbeStatus::Error,
                    elapsed_ms,
                    Some(EINTERNAL.to_string()),
                )
            })
        })
        .collect()
}
