//! Client address resolution for rate limiting and denial logs
//!
//! The socket peer is the client unless it is a configured trusted proxy.
//! Behind a trusted proxy `X-Forwarded-For` is walked right to left and the
//! first hop outside the trusted networks wins, so entries a client prepends
//! never become the key.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{body::Body, extract::ConnectInfo, http::HeaderMap, http::Request};
use ipnetwork::IpNetwork;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Networks whose forwarding headers are believed
#[derive(Debug, Clone)]
pub struct TrustedProxies {
    networks: Arc<[IpNetwork]>,
}

impl Default for TrustedProxies {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TrustedProxies {
    pub fn new(networks: impl Into<Arc<[IpNetwork]>>) -> Self {
        Self {
            networks: networks.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|network| network.contains(ip))
    }

    /// Resolve the client address of `request`, `None` without a socket peer
    pub fn client_ip(&self, request: &Request<Body>) -> Option<IpAddr> {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())?;

        if !self.is_trusted(peer) {
            return Some(peer);
        }

        self.forwarded_client(request.headers())
            .or_else(|| header_ip(request.headers(), X_REAL_IP))
            .or(Some(peer))
    }

    fn forwarded_client(&self, headers: &HeaderMap) -> Option<IpAddr> {
        let mut nearest_trusted = None;

        for value in headers.get_all(X_FORWARDED_FOR).iter().rev() {
            let Ok(value) = value.to_str() else {
                return nearest_trusted;
            };
            for hop in value.rsplit(',') {
                let Some(ip) = parse_hop(hop) else {
                    // Anything left of an unreadable hop is unverifiable
                    return nearest_trusted;
                };
                if !self.is_trusted(ip) {
                    return Some(ip);
                }
                nearest_trusted = Some(ip);
            }
        }

        nearest_trusted
    }
}

impl FromIterator<IpNetwork> for TrustedProxies {
    fn from_iter<I: IntoIterator<Item = IpNetwork>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect::<Vec<_>>())
    }
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_hop)
}

fn parse_hop(hop: &str) -> Option<IpAddr> {
    let hop = hop.trim();
    hop.parse::<IpAddr>()
        .ok()
        .or_else(|| hop.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}
