// src/server/admission.rs

//! Peer address checks applied right after `accept`.

use std::net::IpAddr;

/// Returns true for loopback and private-range peers.
///
/// IPv4: RFC 1918 ranges, loopback and link-local. IPv6: loopback, unique local
/// (`fc00::/7`) and link-local (`fe80::/10`). IPv4-mapped IPv6 addresses are
/// judged by their IPv4 form.
pub fn is_private_peer(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local(),
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_peer(&IpAddr::V4(mapped));
            }
            let first = ipv6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            ipv6.is_loopback() || unique_local || link_local
        }
    }
}
