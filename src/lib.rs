//! Library crate for port-probe: TCP reachability probing with an HTTP front.
pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod ports;
pub mod probe;
pub mod server;
pub mod types;

pub use batch::{Prober, ProberConfig, MAX_BATCH};
pub use error::ProbeError;
pub use probe::{probe_port, probe_port_with_cancel};
pub use types::{sort_results, ProbeRequest, ProbeResult, ProbeStatus, Protocol, SortField};
