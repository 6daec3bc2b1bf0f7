//! The boundary to the socket layer.
//!
//! The core never owns sockets. Every outgoing buffer is handed to a
//! [`Transport`] together with a [`Destination`]; the call is synchronous
//! and fire-and-forget, and failures come back as [`TransportError`] for the
//! caller to log. Turning a URI into a destination is the job of a
//! [`Resolver`]; [`LiteralResolver`] covers URIs whose host is an IP literal.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use sipr_sip_msg::uri::{get_raw_uri, uri_param};
use thiserror::Error;

/// Transport protocol of a socket or destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    Udp,
    Tcp,
    Tls,
    Sctp,
}

impl Proto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proto::Udp => "UDP",
            Proto::Tcp => "TCP",
            Proto::Tls => "TLS",
            Proto::Sctp => "SCTP",
        }
    }

    /// Reliable transports get no retransmissions
    pub fn is_reliable(&self) -> bool {
        !matches!(self, Proto::Udp)
    }

    fn from_param(value: &[u8]) -> Option<Self> {
        if value.eq_ignore_ascii_case(b"udp") {
            Some(Proto::Udp)
        } else if value.eq_ignore_ascii_case(b"tcp") {
            Some(Proto::Tcp)
        } else if value.eq_ignore_ascii_case(b"tls") {
            Some(Proto::Tls)
        } else if value.eq_ignore_ascii_case(b"sctp") {
            Some(Proto::Sctp)
        } else {
            None
        }
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local socket requests are sent from; printed into Via headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketInfo {
    pub address: SocketAddr,
    pub proto: Proto,
    /// Host:port to advertise instead of the bound address
    pub advertised: Option<String>,
}

impl SocketInfo {
    pub fn new(address: SocketAddr, proto: Proto) -> Self {
        SocketInfo { address, proto, advertised: None }
    }

    pub fn with_advertised(mut self, hostport: impl Into<String>) -> Self {
        self.advertised = Some(hostport.into());
        self
    }

    /// `host:port` as it appears in a Via header
    pub fn hostport(&self) -> String {
        match &self.advertised {
            Some(hostport) => hostport.clone(),
            None => self.address.to_string(),
        }
    }
}

/// Where a buffer goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    pub addr: SocketAddr,
    pub proto: Proto,
}

impl Destination {
    pub fn new(addr: SocketAddr, proto: Proto) -> Self {
        Destination { addr, proto }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.proto, self.addr)
    }
}

/// Errors reported by a transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("send to {dest} failed: {reason}")]
    SendFailed { dest: Destination, reason: String },

    #[error("transport for {0} is not available")]
    Unavailable(Proto),
}

/// Sends serialized messages
pub trait Transport: Send + Sync {
    fn send(&self, dest: &Destination, buf: &[u8]) -> Result<(), TransportError>;
}

/// Maps a request target URI to a destination
pub trait Resolver: Send + Sync {
    fn resolve(&self, uri: &[u8]) -> Option<Destination>;
}

/// Resolves URIs whose host part is an IP literal, without DNS.
///
/// The protocol comes from the `transport` parameter, `sips:` implies TLS,
/// and the port defaults to 5060 (5061 for TLS).
#[derive(Debug, Clone, Default)]
pub struct LiteralResolver;

impl Resolver for LiteralResolver {
    fn resolve(&self, uri: &[u8]) -> Option<Destination> {
        let uri = get_raw_uri(uri);
        let text = std::str::from_utf8(uri).ok()?;
        let (scheme, rest) = text.split_once(':')?;
        let secure = scheme.eq_ignore_ascii_case("sips");
        if !secure && !scheme.eq_ignore_ascii_case("sip") {
            return None;
        }

        let proto = match uri_param(uri, "transport") {
            Some(value) => Proto::from_param(value)?,
            None if secure => Proto::Tls,
            None => Proto::Udp,
        };

        let hostport = rest.rsplit_once('@').map_or(rest, |(_, h)| h);
        let hostport = hostport.split([';', '?']).next()?;
        let default_port = if proto == Proto::Tls { 5061 } else { 5060 };

        let addr = if let Some(v6) = hostport.strip_prefix('[') {
            let (host, port) = v6.split_once(']')?;
            let ip: IpAddr = host.parse().ok()?;
            let port = match port.strip_prefix(':') {
                Some(p) => p.parse().ok()?,
                None => default_port,
            };
            SocketAddr::new(ip, port)
        } else {
            let (host, port) = match hostport.split_once(':') {
                Some((h, p)) => (h, p.parse().ok()?),
                None => (hostport, default_port),
            };
            SocketAddr::new(host.parse().ok()?, port)
        };

        Some(Destination::new(addr, proto))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_resolver() {
        let r = LiteralResolver;
        assert_eq!(
            r.resolve(b"sip:bob@10.0.0.7:5070;transport=tcp"),
            Some(Destination::new("10.0.0.7:5070".parse().unwrap(), Proto::Tcp))
        );
        assert_eq!(
            r.resolve(b"<sip:10.0.0.8;lr>"),
            Some(Destination::new("10.0.0.8:5060".parse().unwrap(), Proto::Udp))
        );
        assert_eq!(
            r.resolve(b"sips:[2001:db8::1]"),
            Some(Destination::new("[2001:db8::1]:5061".parse().unwrap(), Proto::Tls))
        );
        assert_eq!(r.resolve(b"sip:bob@example.com"), None);
        assert_eq!(r.resolve(b"tel:+15551234"), None);
    }

    #[test]
    fn test_socket_hostport() {
        let sock = SocketInfo::new("192.0.2.1:5060".parse().unwrap(), Proto::Udp);
        assert_eq!(sock.hostport(), "192.0.2.1:5060");
        assert_eq!(sock.with_advertised("edge.example:5060").hostport(), "edge.example:5060");
    }

    #[test]
    fn test_reliability() {
        assert!(!Proto::Udp.is_reliable());
        assert!(Proto::Tcp.is_reliable());
    }
}
