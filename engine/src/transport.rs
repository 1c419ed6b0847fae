//! Transport seam between the connector and the operating system.
//!
//! Endpoint creation and connection are two distinct, separately-failable
//! steps: the candidate loop skips a candidate whose endpoint cannot be
//! created, and closes the endpoint of a candidate whose connect fails
//! before moving on. The production implementation wraps a blocking
//! `socket2::Socket`; tests substitute mocks that record every step.

use {
    crate::resolve::{Candidate, Family},
    socket2::{Domain, Protocol, SockAddr, Socket, Type},
    std::{
        io::{self, Read, Write},
        net::{Shutdown, SocketAddr},
    },
};

/// Creates transport endpoints for resolved candidates.
pub trait Transport {
    /// Endpoint type produced for each candidate.
    type Endpoint: Endpoint;

    /// Create an endpoint matching the candidate's family. Failure is
    /// recoverable; the connector advances to the next candidate.
    fn open(&mut self, candidate: &Candidate) -> io::Result<Self::Endpoint>;
}

/// An endpoint that has been created but not yet connected.
pub trait Endpoint: Sized {
    /// Established stream type.
    type Stream: Stream;

    /// Attempt to connect to `addr`. On failure the endpoint is handed
    /// back so the caller can close it before trying the next candidate.
    fn connect(self, addr: SocketAddr) -> std::result::Result<Self::Stream, (io::Error, Self)>;

    /// Release the endpoint without connecting it.
    fn close(self) -> io::Result<()>;
}

/// An established, bidirectional byte stream.
pub trait Stream {
    /// Write some bytes; returns how many were accepted.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read some bytes; zero means the peer closed its write side.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Shut down the outbound direction only, leaving inbound readable.
    fn close_write(&mut self) -> io::Result<()>;

    /// Release the stream.
    fn close(self) -> io::Result<()>;
}

/// Blocking TCP transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    type Endpoint = TcpEndpoint;

    fn open(&mut self, candidate: &Candidate) -> io::Result<TcpEndpoint> {
        let domain = match candidate.family {
            Family::V4 => Domain::IPV4,
            Family::V6 => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        Ok(TcpEndpoint { socket })
    }
}

/// An unconnected TCP socket.
#[derive(Debug)]
pub struct TcpEndpoint {
    socket: Socket,
}

impl Endpoint for TcpEndpoint {
    type Stream = TcpChannel;

    fn connect(self, addr: SocketAddr) -> std::result::Result<TcpChannel, (io::Error, Self)> {
        match self.socket.connect(&SockAddr::from(addr)) {
            Ok(()) => Ok(TcpChannel {
                socket: self.socket,
            }),
            Err(err) => Err((err, self)),
        }
    }

    fn close(self) -> io::Result<()> {
        // Dropping the socket closes the descriptor.
        drop(self.socket);
        Ok(())
    }
}

/// An established TCP stream.
#[derive(Debug)]
pub struct TcpChannel {
    socket: Socket,
}

impl Stream for TcpChannel {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.write(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }

    fn close_write(&mut self) -> io::Result<()> {
        self.socket.shutdown(Shutdown::Write)
    }

    fn close(self) -> io::Result<()> {
        // The descriptor itself is released on drop; a full shutdown first
        // surfaces errors the way an explicit close would. NotConnected is
        // expected after the peer has already torn the connection down.
        match self.socket.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_an_ipv4_endpoint() {
        let candidate = Candidate::new("127.0.0.1:1".parse().unwrap());
        let endpoint = TcpTransport.open(&candidate).unwrap();
        endpoint.close().unwrap();
    }

    #[test]
    fn failed_connect_hands_the_endpoint_back() {
        // Bind a listener to reserve a port, then drop it so connecting is
        // refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let candidate = Candidate::new(addr);
        let endpoint = TcpTransport.open(&candidate).unwrap();
        match endpoint.connect(addr) {
            Err((err, endpoint)) => {
                assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
                endpoint.close().unwrap();
            }
            Ok(_) => panic!("connect to a dropped listener port should fail"),
        }
    }
}
