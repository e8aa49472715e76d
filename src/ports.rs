use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A well-known port and the service usually behind it.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonPort {
    pub port: u16,
    pub service: &'static str,
}

const COMMON: &[CommonPort] = &[
    CommonPort { port: 21, service: "FTP" },
    CommonPort { port: 22, service: "SSH" },
    CommonPort { port: 23, service: "Telnet" },
    CommonPort { port: 25, service: "SMTP" },
    CommonPort { port: 53, service: "DNS" },
    CommonPort { port: 80, service: "HTTP" },
    CommonPort { port: 110, service: "POP3" },
    CommonPort { port: 143, service: "IMAP" },
    CommonPort { port: 443, service: "HTTPS" },
    CommonPort { port: 993, service: "IMAPS" },
    CommonPort { port: 995, service: "POP3S" },
    CommonPort { port: 3389, service: "RDP" },
    CommonPort { port: 5900, service: "VNC" },
];

/// The short list of ports offered for one-click testing.
pub fn common_ports() -> &'static [CommonPort] {
    COMMON
}

/// Parse a port specification into a deduplicated list of TCP ports (1..=65535).
///
/// Supported syntax:
/// - single port number: `80`
/// - inclusive range: `8000-8010`
/// - items separated by commas, whitespace or newlines: `22, 80 443`
/// - comments: everything after `#` on a line is ignored
pub fn parse_port_spec(s: &str) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().unwrap_or("");
        // glue spaced ranges ("80 - 90") into one token
        let line = line.split('-').map(str::trim).collect::<Vec<_>>().join("-");

        for item in line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            if let Some((a, b)) = item.split_once('-') {
                let start = parse_port_str(a)
                    .with_context(|| format!("line {line_no}: invalid start in range: {item}"))?;
                let end = parse_port_str(b)
                    .with_context(|| format!("line {line_no}: invalid end in range: {item}"))?;
                if start > end {
                    bail!("line {line_no}: invalid range {start}-{end} (start > end)");
                }
                for p in start..=end {
                    if seen.insert(p) {
                        out.push(p);
                    }
                }
                continue;
            }

            let p = parse_port_str(item)
                .with_context(|| format!("line {line_no}: invalid port value: {item}"))?;
            if seen.insert(p) {
                out.push(p);
            }
        }
    }

    Ok(out)
}

/// Load a port specification from a file. Errors if the file cannot be read or parsed.
pub fn load_ports_from_path(path: impl AsRef<Path>) -> Result<Vec<u16>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read ports file: {}", path.as_ref().display()))?;
    parse_port_spec(&content)
}

/// Split a port list into sub-batches of at most `size` ports (a size of 0 is treated as 1).
pub fn chunk_ports(ports: &[u16], size: usize) -> impl Iterator<Item = &[u16]> {
    ports.chunks(size.max(1))
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.trim().parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}
