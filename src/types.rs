use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ProbeError;

/// Classified outcome of a single probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Open,
    Closed,
    Timeout,
    Unreachable,
    Error,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeStatus::Open => "open",
            ProbeStatus::Closed => "closed",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Unreachable => "unreachable",
            ProbeStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Transport protocol of a probe. Only TCP is probed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    #[serde(rename = "TCP")]
    Tcp,
}

/// A validated (host, port, timeout) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ProbeRequest {
    /// Validate and build a request. Port 0, a zero timeout and malformed hosts are rejected.
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Result<Self, ProbeError> {
        let host = validate_host(&host.into())?;
        if port == 0 {
            return Err(ProbeError::InvalidPort(0));
        }
        if timeout.is_zero() {
            return Err(ProbeError::InvalidTimeout);
        }
        Ok(Self {
            host,
            port,
            timeout,
        })
    }

    /// Like [`ProbeRequest::new`] but takes an unchecked wire integer for the port.
    pub fn from_raw_port(
        host: impl Into<String>,
        port: i64,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let port = u16::try_from(port).map_err(|_| ProbeError::InvalidPort(port))?;
        Self::new(host, port, timeout)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Outcome of one probe, serialized in the shape the HTTP API returns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub status: ProbeStatus,
    #[serde(rename = "responseTime")]
    pub response_time_ms: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    /// Build a result stamped with the current UTC time.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        status: ProbeStatus,
        response_time_ms: u64,
        error: Option<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: Protocol::Tcp,
            status,
            response_time_ms,
            timestamp: OffsetDateTime::now_utc(),
            error,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ProbeStatus::Open
    }
}

/// Column a result list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Port,
    Status,
    ResponseTime,
    Timestamp,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "port" => Ok(SortField::Port),
            "status" => Ok(SortField::Status),
            "response-time" | "responsetime" | "time" => Ok(SortField::ResponseTime),
            "timestamp" => Ok(SortField::Timestamp),
            other => Err(format!(
                "unknown sort field '{other}' (expected port, status, response-time or timestamp)"
            )),
        }
    }
}

/// Stable sort of `results` by `field`; `descending` reverses the order.
pub fn sort_results(results: &mut [ProbeResult], field: SortField, descending: bool) {
    results.sort_by(|a, b| {
        let ord = match field {
            SortField::Port => a.port.cmp(&b.port),
            SortField::Status => a.status.to_string().cmp(&b.status.to_string()),
            SortField::ResponseTime => a.response_time_ms.cmp(&b.response_time_ms),
            SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        };
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// Normalize and check a host string: an IP literal (IPv6 optionally bracketed)
/// or an RFC 1123 hostname.
pub(crate) fn validate_host(raw: &str) -> Result<String, ProbeError> {
    let host = raw.trim();
    if host.is_empty() {
        return Err(ProbeError::EmptyHost);
    }
    let unbracketed = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if unbracketed.parse::<IpAddr>().is_ok() {
        return Ok(unbracketed.to_string());
    }
    if is_valid_hostname(host) {
        Ok(host.to_string())
    } else {
        Err(ProbeError::InvalidHost(host.to_string()))
    }
}

fn is_valid_hostname(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_bad_input() {
        let t = Duration::from_millis(100);
        assert!(matches!(ProbeRequest::new("", 80, t), Err(ProbeError::EmptyHost)));
        assert!(matches!(ProbeRequest::new("   ", 80, t), Err(ProbeError::EmptyHost)));
        assert!(matches!(
            ProbeRequest::new("bad host", 80, t),
            Err(ProbeError::InvalidHost(_))
        ));
        assert!(matches!(
            ProbeRequest::new("127.0.0.1", 0, t),
            Err(ProbeError::InvalidPort(0))
        ));
        assert!(matches!(
            ProbeRequest::new("127.0.0.1", 80, Duration::ZERO),
            Err(ProbeError::InvalidTimeout)
        ));
        assert!(matches!(
            ProbeRequest::from_raw_port("127.0.0.1", 65536, t),
            Err(ProbeError::InvalidPort(65536))
        ));
        assert!(matches!(
            ProbeRequest::from_raw_port("127.0.0.1", -1, t),
            Err(ProbeError::InvalidPort(-1))
        ));
    }

    #[test]
    fn hosts_are_normalized() {
        let t = Duration::from_millis(100);
        assert_eq!(ProbeRequest::new(" example.com ", 1, t).unwrap().host(), "example.com");
        assert_eq!(ProbeRequest::new("[::1]", 1, t).unwrap().host(), "::1");
        assert_eq!(ProbeRequest::new("10.0.0.1", 1, t).unwrap().host(), "10.0.0.1");
        assert!(ProbeRequest::new("-bad.example", 1, t).is_err());
        assert!(ProbeRequest::new("a..b", 1, t).is_err());
    }

    #[test]
    fn result_json_shape() {
        let r = ProbeResult::new("127.0.0.1", 22, ProbeStatus::Closed, 3, Some("ECONNREFUSED".into()));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["protocol"], "TCP");
        assert_eq!(v["status"], "closed");
        assert_eq!(v["responseTime"], 3);
        assert_eq!(v["error"], "ECONNREFUSED");
        assert!(v["timestamp"].as_str().unwrap().ends_with('Z'));

        let open = ProbeResult::new("127.0.0.1", 22, ProbeStatus::Open, 1, None);
        let v = serde_json::to_value(&open).unwrap();
        assert!(v.get("error").is_none());
        assert!(open.is_open());
    }

    #[test]
    fn sorts_by_field_and_direction() {
        let mut results = vec![
            ProbeResult::new("h", 443, ProbeStatus::Open, 30, None),
            ProbeResult::new("h", 22, ProbeStatus::Timeout, 5, None),
            ProbeResult::new("h", 80, ProbeStatus::Closed, 12, None),
        ];

        sort_results(&mut results, SortField::Port, false);
        assert_eq!(results.iter().map(|r| r.port).collect::<Vec<_>>(), vec![22, 80, 443]);

        sort_results(&mut results, SortField::ResponseTime, true);
        assert_eq!(results.iter().map(|r| r.port).collect::<Vec<_>>(), vec![443, 80, 22]);

        sort_results(&mut results, SortField::Status, false);
        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![ProbeStatus::Closed, ProbeStatus::Open, ProbeStatus::Timeout]);
    }

    #[test]
    fn sort_field_parses() {
        assert_eq!("Port".parse::<SortField>(), Ok(SortField::Port));
        assert_eq!("response-time".parse::<SortField>(), Ok(SortField::ResponseTime));
        assert!("banner".parse::<SortField>().is_err());
    }
}
