//! Host/IP validation blocking private and link-local targets (spec §4.1).

use crate::errors::{CoreError, Result};
use std::net::IpAddr;
use tokio::net::lookup_host;
use url::Url;

fn is_blocked(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unicast_link_local() || v6.to_ipv4_mapped().is_some_and(is_blocked_v4),
    }
}

fn is_blocked_v4(v4: std::net::Ipv4Addr) -> bool {
    v4.is_private() || v4.is_loopback() || v4.is_link_local()
}

/// Resolves `url`'s host and rejects it if any resolved address is private
/// or link-local. Must be re-run for every redirect hop, not just the
/// original request (spec §4.1).
pub async fn assert_not_blocked(url: &Url) -> Result<()> {
    let host = url.host_str().ok_or_else(|| CoreError::InvalidFilter("URL has no host".into()))?;
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = lookup_host((host, port)).await.map_err(|e| CoreError::UpstreamUnavailable(e.to_string()))?;
    let mut saw_any = false;
    for addr in addrs {
        saw_any = true;
        if is_blocked(addr.ip()) {
            return Err(CoreError::BlockedHost);
        }
    }
    if !saw_any {
        return Err(CoreError::UpstreamUnavailable(format!("could not resolve host {host}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_ranges_are_blocked() {
        assert!(is_blocked("10.0.0.1".parse().unwrap()));
        assert!(is_blocked("172.16.0.1".parse().unwrap()));
        assert!(is_blocked("192.168.1.1".parse().unwrap()));
        assert!(is_blocked("127.0.0.1".parse().unwrap()));
        assert!(is_blocked("169.254.1.1".parse().unwrap()));
    }

    #[test]
    fn public_addresses_are_not_blocked() {
        assert!(!is_blocked("8.8.8.8".parse().unwrap()));
        assert!(!is_blocked("140.82.112.3".parse().unwrap()));
    }

    #[tokio::test]
    async fn rejects_url_with_no_host() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        let err = assert_not_blocked(&url).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidFilter(_)));
    }
}
