use std::net::IpAddr;

use ipnetwork::IpNetwork;
use once_cell::sync::Lazy;

use crate::utils::CoreError;

/// Loopback, link-local, and private ranges a webhook target must
/// never resolve into; reuses the donor's `IpNetwork`-based CIDR
/// matching from `IpWhitelist`, pointed the opposite direction
/// (blocking outbound destinations instead of allowing inbound
/// callers).
static BLOCKED_NETWORKS: Lazy<Vec<IpNetwork>> = Lazy::new(|| {
    [
        "127.0.0.0/8",
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "169.254.0.0/16",
        "::1/128",
        "fc00::/7",
        "fe80::/10",
    ]
    .iter()
    .map(|cidr| cidr.parse().expect("static CIDR literal"))
    .collect()
});

pub fn is_blocked(ip: IpAddr) -> bool {
    BLOCKED_NETWORKS.iter().any(|net| net.contains(ip))
}

/// Resolves `host` and rejects it if any resolved address falls in a
/// blocked range, closing the DNS-rebinding gap a hostname-only
/// allowlist would miss.
pub async fn guard_host(host: &str, port: u16) -> Result<(), CoreError> {
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| CoreError::ValidationError(format!("could not resolve webhook host: {e}")))?;

    let mut resolved_any = false;
    for addr in addrs {
        resolved_any = true;
        if is_blocked(addr.ip()) {
            return Err(CoreError::ValidationError(format!(
                "webhook host {host} resolves to a disallowed address {}",
                addr.ip()
            )));
        }
    }

    if !resolved_any {
        return Err(CoreError::ValidationError(format!(
            "webhook host {host} did not resolve to any address"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_loopback_and_private_ranges() {
        assert!(is_blocked("127.0.0.1".parse().unwrap()));
        assert!(is_blocked("10.1.2.3".parse().unwrap()));
        assert!(is_blocked("169.254.1.1".parse().unwrap()));
    }

    #[test]
    fn allows_public_addresses() {
        assert!(!is_blocked("8.8.8.8".parse().unwrap()));
    }
}
