//! Mapping from connect failures to a [`ProbeStatus`] and a stable error code.
//!
//! | condition                         | status        | code           |
//! |-----------------------------------|---------------|----------------|
//! | connection refused                | `closed`      | `ECONNREFUSED` |
//! | no route to host                  | `unreachable` | `EHOSTUNREACH` |
//! | network unreachable               | `unreachable` | `ENETUNREACH`  |
//! | name resolution failed            | `error`       | `ENOTFOUND`    |
//! | anything else                     | `error`       | errno name, or `E<code>` if unknown |
//!
//! Unix platforms are classified by raw errno; other platforms fall back to
//! `io::ErrorKind`.

use std::io;

use crate::types::ProbeStatus;

pub const ENOTFOUND: &str = "ENOTFOUND";
pub const ECANCELED: &str = "ECANCELED";
pub const EINTERNAL: &str = "EINTERNAL";

/// Why a connect attempt failed before the timeout.
#[derive(Debug)]
pub enum ConnectFailure {
    /// Name lookup failed or returned no addresses.
    Resolve(Option<io::Error>),
    /// Every resolved address refused or errored; holds the last error.
    Connect(io::Error),
}

/// Classify a failure into a status plus the code reported in `ProbeResult::error`.
pub fn classify(failure: &ConnectFailure) -> (ProbeStatus, String) {
    match failure {
        ConnectFailure::Resolve(_) => (ProbeStatus::Error, ENOTFOUND.to_string()),
        ConnectFailure::Connect(err) => classify_io(err),
    }
}

pub fn classify_io(err: &io::Error) -> (ProbeStatus, String) {
    if let Some(found) = err.raw_os_error().and_then(classify_errno) {
        return found;
    }
    match err.kind() {
        io::ErrorKind::ConnectionRefused => (ProbeStatus::Closed, "ECONNREFUSED".into()),
        io::ErrorKind::HostUnreachable => (ProbeStatus::Unreachable, "EHOSTUNREACH".into()),
        io::ErrorKind::NetworkUnreachable => (ProbeStatus::Unreachable, "ENETUNREACH".into()),
        io::ErrorKind::NetworkDown => (ProbeStatus::Error, "ENETDOWN".into()),
        io::ErrorKind::ConnectionReset => (ProbeStatus::Error, "ECONNRESET".into()),
        io::ErrorKind::ConnectionAborted => (ProbeStatus::Error, "ECONNABORTED".into()),
        io::ErrorKind::TimedOut => (ProbeStatus::Error, "ETIMEDOUT".into()),
        io::ErrorKind::AddrNotAvailable => (ProbeStatus::Error, "EADDRNOTAVAIL".into()),
        io::ErrorKind::PermissionDenied => (ProbeStatus::Error, "EACCES".into()),
        _ => match err.raw_os_error() {
            Some(code) => (ProbeStatus::Error, format!("E{code}")),
            None => (ProbeStatus::Error, format!("{:?}", err.kind())),
        },
    }
}

#[cfg(unix)]
fn classify_errno(code: i32) -> Option<(ProbeStatus, String)> {
    let (status, name) = match code {
        libc::ECONNREFUSED => (ProbeStatus::Closed, "ECONNREFUSED"),
        libc::EHOSTUNREACH => (ProbeStatus::Unreachable, "EHOSTUNREACH"),
        libc::ENETUNREACH => (ProbeStatus::Unreachable, "ENETUNREACH"),
        libc::ENETDOWN => (ProbeStatus::Error, "ENETDOWN"),
        libc::EHOSTDOWN => (ProbeStatus::Error, "EHOSTDOWN"),
        libc::ECONNRESET => (ProbeStatus::Error, "ECONNRESET"),
        libc::ECONNABORTED => (ProbeStatus::Error, "ECONNABORTED"),
        libc::ETIMEDOUT => (ProbeStatus::Error, "ETIMEDOUT"),
        libc::EADDRNOTAVAIL => (ProbeStatus::Error, "EADDRNOTAVAIL"),
        libc::EADDRINUSE => (ProbeStatus::Error, "EADDRINUSE"),
        libc::EAFNOSUPPORT => (ProbeStatus::Error, "EAFNOSUPPORT"),
        libc::EACCES => (ProbeStatus::Error, "EACCES"),
        libc::EPERM => (ProbeStatus::Error, "EPERM"),
        libc::EMFILE => (ProbeStatus::Error, "EMFILE"),
        libc::ENFILE => (ProbeStatus::Error, "ENFILE"),
        libc::ENOBUFS => (ProbeStatus::Error, "ENOBUFS"),
        _ => return None,
    };
    Some((status, name.to_string()))
}

#[cfg(not(unix))]
fn classify_errno(_code: i32) -> Option<(ProbeStatus, String)> {
    None
}
