use std::fmt;
use std::net::IpAddr;

/// Identity of a cache node or the configuration endpoint: `(host, port)`.
///
/// Equality and hashing use the resolved representation — the IP, when one
/// was determined from the wire token or from a real connection — so that
/// `foo.example|10.0.0.1|11211` and a later roster entry for the same node
/// with an empty hostname field still compare equal. The original hostname
/// is retained only for diagnostics (logging, `Display`).
#[derive(Debug, Clone)]
pub struct NodeEndpoint {
    hostname: String,
    resolved: ResolvedHost,
    port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ResolvedHost {
    Ip(IpAddr),
    Hostname(String),
}

impl NodeEndpoint {
    pub fn new(hostname: impl Into<String>, ip: Option<IpAddr>, port: u16) -> Self {
        let hostname = hostname.into();
        let resolved = match ip {
            Some(ip) => ResolvedHost::Ip(ip),
            None => ResolvedHost::Hostname(hostname.clone()),
        };
        Self { hostname, resolved, port }
    }

    pub fn from_host_port(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let ip = host.parse::<IpAddr>().ok();
        Self::new(host, ip, port)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The host string to dial: the resolved IP if known, else the hostname.
    pub fn dial_host(&self) -> String {
        match &self.resolved {
            ResolvedHost::Ip(ip) => ip.to_string(),
            ResolvedHost::Hostname(h) => h.clone(),
        }
    }
}

impl PartialEq for NodeEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.resolved == other.resolved && self.port == other.port
    }
}

impl Eq for NodeEndpoint {}

impl std::hash::Hash for NodeEndpoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.resolved.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_prefers_resolved_ip() {
        let a = NodeEndpoint::new("foo.example", "10.0.0.1".parse().ok(), 11211);
        let b = NodeEndpoint::new("bar.example", "10.0.0.1".parse().ok(), 11211);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_ports_are_distinct() {
        let a = NodeEndpoint::new("foo.example", "10.0.0.1".parse().ok(), 11211);
        let b = NodeEndpoint::new("foo.example", "10.0.0.1".parse().ok(), 11212);
        assert_ne!(a, b);
    }

    #[test]
    fn hostname_only_falls_back_to_name_comparison() {
        let a = NodeEndpoint::new("foo.example", None, 11211);
        let b = NodeEndpoint::new("foo.example", None, 11211);
        assert_eq!(a, b);
    }
}
