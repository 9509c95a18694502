//! Small value formatters shared by the emitters.

use crate::config::serde_helpers::LooseNumber;

/// `host:port`, or the bare host when no usable port was given.
pub fn upstream_address(host: &str, port: &LooseNumber) -> String {
    match port.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// All upstreams of a proxy clause, in input order. Blank hosts are dropped.
pub fn upstream_list(hosts: &[String], port: &LooseNumber) -> Vec<String> {
    hosts
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .map(|h| upstream_address(h, port))
        .collect()
}

/// Duration arguments: a bare integer means seconds.
pub fn duration(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("{trimmed}s"))
    } else {
        Some(trimmed.to_string())
    }
}

/// Non-empty trimmed text.
pub fn present(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Quote an argument that would otherwise split into several tokens.
pub fn quote_arg(raw: &str) -> String {
    if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw.to_string()
    }
}
