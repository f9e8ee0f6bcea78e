//! Parser for the configuration endpoint's textual response to
//! `config get cluster\r\n`:
//!
//! ```text
//! CONFIG cluster 0 <payload_byte_length>\r\n
//! <config_version>\n<host>|<ip>|<port> <host>|<ip>|<port> ...\r\n
//! END\r\n
//! ```

use crate::endpoint::NodeEndpoint;
use crate::error::DiscoveryError;

pub const COMMAND: &str = "config get cluster\r\n";

/// A parsed, versioned cluster roster.
#[derive(Debug, Clone)]
pub struct ClusterConfigResponse {
    pub config_version: u64,
    pub endpoints: Vec<NodeEndpoint>,
}

/// Parse the three logical lines of a `CONFIG cluster` response.
///
/// `header` is the first line (`CONFIG cluster 0 <len>`), `body` is the
/// second line (version + node tokens). The trailing `END\r\n` carries no
/// information and is not passed in — callers strip it while reading.
pub fn parse_cluster_response(header: &str, body: &str) -> Result<ClusterConfigResponse, DiscoveryError> {
    validate_header(header)?;

    let mut lines = body.splitn(2, '\n');
    let version_line = lines
        .next()
        .ok_or_else(|| DiscoveryError::Parse("missing config_version line".into()))?;
    let nodes_line = lines.next().unwrap_or("");

    let config_version: u64 = version_line
        .trim()
        .parse()
        .map_err(|_| DiscoveryError::Parse(format!("invalid config_version: {version_line:?}")))?;

    let endpoints = nodes_line
        .trim_end_matches(['\r', '\n'])
        .split_whitespace()
        .map(parse_node_token)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClusterConfigResponse { config_version, endpoints })
}

fn validate_header(header: &str) -> Result<(), DiscoveryError> {
    let header = header.trim_end_matches(['\r', '\n']);
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("CONFIG"), Some("cluster")) => Ok(()),
        _ => Err(DiscoveryError::Parse(format!("unexpected response header: {header:?}"))),
    }
}

/// Parse one `hostname|ip|port` token. Either `hostname` or `ip` may be
/// empty; `ip` is preferred when present.
fn parse_node_token(token: &str) -> Result<NodeEndpoint, DiscoveryError> {
    let mut fields = token.split('|');
    let (hostname, ip, port) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(h), Some(i), Some(p), None) => (h, i, p),
        _ => return Err(DiscoveryError::Parse(format!("malformed node token: {token:?}"))),
    };

    let port: u16 = port
        .parse()
        .map_err(|_| DiscoveryError::Parse(format!("invalid port in node token: {token:?}")))?;

    let resolved_ip = if ip.is_empty() { None } else { ip.parse().ok() };

    if resolved_ip.is_none() && ip.is_empty() && hostname.is_empty() {
        return Err(DiscoveryError::Parse(format!(
            "node token has neither hostname nor ip: {token:?}"
        )));
    }

    let display_host = if !hostname.is_empty() { hostname } else { ip };
    Ok(NodeEndpoint::new(display_host, resolved_ip, port))
}
