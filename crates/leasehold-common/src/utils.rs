//! Host identity helpers
//!
//! Used to build the diagnostic value stored alongside a lock record.

use chrono::{SecondsFormat, Utc};
use if_addrs::IfAddr;

/// Get the local IP address
///
/// Returns the first non-loopback IPv4 address found,
/// or "127.0.0.1" as fallback.
///
/// # Examples
///
/// ```
/// use leasehold_common::local_ip;
///
/// let ip = local_ip();
/// assert!(!ip.is_empty());
/// ```
pub fn local_ip() -> String {
    if_addrs::get_if_addrs()
        .ok()
        .and_then(|addrs| {
            addrs
                .into_iter()
                .find(|iface| !iface.is_loopback() && matches!(iface.addr, IfAddr::V4(_)))
                .and_then(|iface| match iface.addr {
                    IfAddr::V4(addr) => Some(addr.ip.to_string()),
                    _ => None,
                })
        })
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Get the local hostname, or an empty string when it cannot be read
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_default()
}

/// Describe the current process as a lock holder
///
/// Format: `lockedAt:<UTC timestamp>@<hostname>(<ip>)`. The value is never
/// read back by the lock protocol; it only helps an operator who inspects
/// the store.
pub fn holder_marker() -> String {
    format!(
        "lockedAt:{}@{}({})",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        local_hostname(),
        local_ip()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_returns_valid_ip() {
        let ip = local_ip();
        // Should either be a valid IP or fallback to 127.0.0.1
        assert!(
            ip == "127.0.0.1" || ip.split('.').filter_map(|s| s.parse::<u8>().ok()).count() == 4
        );
    }

    #[test]
    fn test_holder_marker_format() {
        let marker = holder_marker();
        assert!(marker.starts_with("lockedAt:"));
        assert!(marker.contains('@'));
        assert!(marker.ends_with(')'));

        let ip = &marker[marker.rfind('(').unwrap() + 1..marker.len() - 1];
        assert!(!ip.is_empty());

        // Timestamp is second precision UTC, e.g. 2024-01-01T00:00:00Z
        let ts = &marker["lockedAt:".len()..marker.find('@').unwrap()];
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
    }
}
