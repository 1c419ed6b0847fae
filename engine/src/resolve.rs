//! Name resolution into an ordered list of connect candidates.

use {
    std::{
        io,
        net::{SocketAddr, ToSocketAddrs},
    },
    thiserror::Error,
};

/// Address family of a resolved candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

/// One resolved combination of address family and socket address.
///
/// Candidates are tried strictly in the order the resolver returned them;
/// the first successful connect wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Family the transport endpoint must be created with.
    pub family: Family,
    /// Address to connect to.
    pub addr: SocketAddr,
}

impl Candidate {
    /// Candidate for `addr`, with the family derived from it.
    pub fn new(addr: SocketAddr) -> Self {
        let family = match addr {
            SocketAddr::V4(_) => Family::V4,
            SocketAddr::V6(_) => Family::V6,
        };
        Self { family, addr }
    }
}

/// Why a lookup produced no candidates.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The lookup failed at the OS level; the source is the system error.
    #[error("system error during name resolution")]
    System(#[source] io::Error),

    /// The resolver rejected the name or service.
    #[error("{0}")]
    Lookup(String),
}

/// Turns a host/port pair into an ordered list of candidates.
pub trait Resolver {
    /// Resolve `host:port`. An empty list is a valid outcome; the connector
    /// treats it the same as a list whose candidates all failed.
    fn resolve(&self, host: &str, port: &str) -> Result<Vec<Candidate>, ResolveError>;
}

/// Family-agnostic, stream-oriented system lookup (`getaddrinfo` under the
/// hood via [`ToSocketAddrs`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str, port: &str) -> Result<Vec<Candidate>, ResolveError> {
        let port: u16 = port
            .parse()
            .map_err(|_| ResolveError::Lookup(format!("invalid port {port:?}")))?;

        let addrs = (host, port).to_socket_addrs().map_err(classify)?;

        Ok(addrs.map(Candidate::new).collect())
    }
}

/// Lookups surface as one `io::Error`; a raw OS error code tells a
/// system-level failure apart from a resolver-specific one.
fn classify(err: io::Error) -> ResolveError {
    if err.raw_os_error().is_some() {
        ResolveError::System(err)
    } else {
        ResolveError::Lookup(err.to_string())
    }
}
