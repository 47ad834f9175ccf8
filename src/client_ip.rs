//! Client IP resolution behind reverse proxies.
//!
//! tsu runs behind nginx or an ingress controller, so the TCP peer is usually
//! the proxy rather than the client. Forwarding headers are only believed
//! when the peer is a proxy you listed with
//! [`Server::trust_proxy`](crate::Server::trust_proxy); anybody else could
//! put whatever they like in `X-Forwarded-For`.
//!
//! Resolution order for a trusted peer:
//!
//! 1. `X-Forwarded-For`, walked right to left; the first hop that is not a
//!    trusted proxy is the client. If every hop is trusted, the leftmost wins.
//! 2. `X-Real-IP`.
//! 3. The peer address itself.
//!
//! A header containing anything that does not parse as an IP is ignored as a
//! whole.

use std::collections::HashSet;
use std::net::IpAddr;

use http::HeaderMap;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Proxy addresses whose forwarding headers are trusted. Empty by default.
#[derive(Clone, Debug, Default)]
pub struct TrustedProxies(HashSet<IpAddr>);

impl TrustedProxies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ip: IpAddr) {
        self.0.insert(ip);
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<IpAddr> for TrustedProxies {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolves the client address for a request received from `peer`.
///
/// Returns `None` only when the peer is unknown (requests built in-process
/// rather than read off a socket).
pub(crate) fn resolve(
    peer: Option<IpAddr>,
    headers: &HeaderMap,
    trusted: &TrustedProxies,
) -> Option<IpAddr> {
    let peer = peer?;
    if !trusted.contains(&peer) {
        return Some(peer);
    }

    forwarded_for(headers, trusted)
        .or_else(|| real_ip(headers))
        .or(Some(peer))
}

fn forwarded_for(headers: &HeaderMap, trusted: &TrustedProxies) -> Option<IpAddr> {
    // Repeated headers are one logical list, in order of appearance.
    let mut hops = Vec::new();
    for value in headers.get_all(X_FORWARDED_FOR) {
        for hop in value.to_str().ok()?.split(',') {
            hops.push(hop.trim().parse::<IpAddr>().ok()?);
        }
    }

    let leftmost = *hops.first()?;
    let client = hops.into_iter().rev().find(|ip| !trusted.contains(ip));
    Some(client.unwrap_or(leftmost))
}

fn real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers.get(X_REAL_IP)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, value.parse().unwrap());
        }
        map
    }

    fn proxies(list: &[&str]) -> TrustedProxies {
        list.iter().map(|s| ip(s)).collect()
    }

    #[test]
    fn untrusted_peer_ignores_headers() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4"), ("x-real-ip", "5.6.7.8")]);
        let got = resolve(Some(ip("10.0.0.1")), &h, &TrustedProxies::new());
        assert_eq!(got, Some(ip("10.0.0.1")));
    }

    #[test]
    fn trusted_peer_uses_rightmost_untrusted_hop() {
        let h = headers(&[("x-forwarded-for", "203.0.113.9, 198.51.100.2, 10.0.0.2")]);
        let trusted = proxies(&["10.0.0.1", "10.0.0.2"]);
        let got = resolve(Some(ip("10.0.0.1")), &h, &trusted);
        assert_eq!(got, Some(ip("198.51.100.2")));
    }

    #[test]
    fn all_trusted_hops_fall_back_to_leftmost() {
        let h = headers(&[("x-forwarded-for", "10.0.0.3, 10.0.0.2")]);
        let trusted = proxies(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        let got = resolve(Some(ip("10.0.0.1")), &h, &trusted);
        assert_eq!(got, Some(ip("10.0.0.3")));
    }

    #[test]
    fn repeated_forwarded_for_headers_are_joined() {
        let h = headers(&[
            ("x-forwarded-for", "203.0.113.9"),
            ("x-forwarded-for", "10.0.0.2"),
        ]);
        let trusted = proxies(&["10.0.0.1", "10.0.0.2"]);
        assert_eq!(resolve(Some(ip("10.0.0.1")), &h, &trusted), Some(ip("203.0.113.9")));
    }

    #[test]
    fn garbage_forwarded_for_falls_through_to_real_ip() {
        let h = headers(&[("x-forwarded-for", "203.0.113.9, not-an-ip"), ("x-real-ip", "192.0.2.7")]);
        let trusted = proxies(&["10.0.0.1"]);
        assert_eq!(resolve(Some(ip("10.0.0.1")), &h, &trusted), Some(ip("192.0.2.7")));
    }

    #[test]
    fn trusted_peer_without_headers_is_the_client() {
        let trusted = proxies(&["10.0.0.1"]);
        let got = resolve(Some(ip("10.0.0.1")), &HeaderMap::new(), &trusted);
        assert_eq!(got, Some(ip("10.0.0.1")));
    }

    #[test]
    fn unknown_peer_resolves_to_none() {
        assert_eq!(resolve(None, &HeaderMap::new(), &TrustedProxies::new()), None);
    }
}
