//! Connection lifecycle and the buffered transfer engine.
//!
//! A [`Connection`] owns the remote identity, the fixed-capacity buffer
//! reused for both directions, and (while connected) the transport stream.
//! The lifecycle is `Unconnected → Connected → WriteClosed → Closed`;
//! [`Connection::connect`] may be called again on a closed connection to
//! reconnect it.

use {
    crate::{
        diag::Diagnostics,
        error::{EngineError, Result},
        resolve::{Resolver, SystemResolver},
        transport::{Endpoint, Stream, TcpTransport, Transport},
    },
    std::fmt,
};

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// No stream attached yet.
    Unconnected,
    /// Stream attached, both directions open.
    Connected,
    /// Outbound direction shut down, inbound still readable.
    WriteClosed,
    /// Stream released. `connect` is valid again.
    Closed,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconnected => "unconnected",
            Self::Connected => "connected",
            Self::WriteClosed => "write-closed",
            Self::Closed => "closed",
        })
    }
}

type StreamOf<T> = <<T as Transport>::Endpoint as Endpoint>::Stream;

/// A single request/response TCP connection with a caller-sized buffer.
///
/// The resolver and transport are injected; production code uses the
/// defaults, tests substitute scripted implementations.
pub struct Connection<R = SystemResolver, T = TcpTransport>
where
    R: Resolver,
    T: Transport,
{
    remote_host: String,
    remote_port: String,
    buffer: Vec<u8>,
    state: ConnState,
    stream: Option<StreamOf<T>>,
    resolver: R,
    transport: T,
    diag: Diagnostics,
}

impl Connection<SystemResolver, TcpTransport> {
    /// TCP connection using the system resolver and default diagnostics.
    pub fn new(host: impl Into<String>, port: impl Into<String>, capacity: usize) -> Self {
        Self::with_diagnostics(host, port, capacity, Diagnostics::default())
    }

    /// TCP connection using the system resolver and the given diagnostics.
    pub fn with_diagnostics(
        host: impl Into<String>,
        port: impl Into<String>,
        capacity: usize,
        diag: Diagnostics,
    ) -> Self {
        Self::with_parts(host, port, capacity, SystemResolver, TcpTransport, diag)
    }
}

impl<R, T> Connection<R, T>
where
    R: Resolver,
    T: Transport,
{
    /// Connection with every collaborator supplied explicitly.
    pub fn with_parts(
        host: impl Into<String>,
        port: impl Into<String>,
        capacity: usize,
        resolver: R,
        transport: T,
        diag: Diagnostics,
    ) -> Self {
        Self {
            remote_host: host.into(),
            remote_port: port.into(),
            buffer: vec![0; capacity],
            state: ConnState::Unconnected,
            stream: None,
            resolver,
            transport,
            diag,
        }
    }

    /// Host this connection is for.
    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    /// Port this connection is for.
    pub fn remote_port(&self) -> &str {
        &self.remote_port
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Fixed buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The connection buffer. After a successful [`Connection::receive`],
    /// the first `bytes_read` bytes hold the received data.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Mutable access to the connection buffer, for filling in a request
    /// before [`Connection::send`].
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Resolve the remote host/port and connect to the first candidate
    /// that accepts, in resolution order.
    ///
    /// Candidates whose endpoint cannot be created or whose connect fails
    /// are skipped; each failed candidate's endpoint is closed before the
    /// next one is tried. If the list is exhausted the call fails with
    /// [`EngineError::Exhausted`], attributed to the last system error
    /// observed.
    pub fn connect(&mut self) -> Result<()> {
        const ORIGIN: &str = "connect";
        let target = format!("{}:{}", self.remote_host, self.remote_port);

        self.require_state(ORIGIN, &[ConnState::Unconnected, ConnState::Closed])?;
        self.diag
            .debug(ORIGIN, &format!("called to connect to {target}"));

        let candidates = match self.resolver.resolve(&self.remote_host, &self.remote_port) {
            Ok(candidates) => candidates,
            Err(err) => {
                self.diag.sys_error(
                    ORIGIN,
                    &err.to_string(),
                    &format!("unable to resolve {target}"),
                );
                return Err(err.into());
            }
        };

        let mut last_err = None;

        for candidate in candidates {
            self.diag.debug(
                ORIGIN,
                &format!(
                    "resolved into family {:?}, addr {}",
                    candidate.family, candidate.addr
                ),
            );

            let endpoint = match self.transport.open(&candidate) {
                Ok(endpoint) => endpoint,
                Err(err) => {
                    self.diag.sys_warning(
                        ORIGIN,
                        &err.to_string(),
                        &format!("unable to create socket with family {:?}", candidate.family),
                    );
                    last_err = Some(err);
                    continue; // This candidate failed, try next
                }
            };

            self.diag.debug(ORIGIN, "socket created");

            match endpoint.connect(candidate.addr) {
                Ok(stream) => {
                    self.diag.debug(ORIGIN, "connection established");
                    self.stream = Some(stream);
                    self.state = ConnState::Connected;
                    self.diag
                        .debug(ORIGIN, &format!("connected to {target}, return"));
                    return Ok(());
                }
                Err((err, endpoint)) => {
                    self.diag.sys_info(
                        ORIGIN,
                        &err.to_string(),
                        &format!("address {} failed, trying next (if any)", candidate.addr),
                    );
                    last_err = Some(err);

                    // A close failure leaves nothing to reuse; skip to the
                    // next candidate rather than aborting the loop.
                    match endpoint.close() {
                        Ok(()) => self.diag.debug(ORIGIN, "socket closed"),
                        Err(close_err) => self.diag.sys_warning(
                            ORIGIN,
                            &close_err.to_string(),
                            &format!("unable to close socket for {}", candidate.addr),
                        ),
                    }
                }
            }
        }

        let detail = last_err
            .as_ref()
            .map_or_else(|| "no candidate addresses".to_string(), |e| e.to_string());
        self.diag
            .sys_error(ORIGIN, &detail, &format!("unable to connect to {target}"));

        Err(EngineError::Exhausted {
            host: self.remote_host.clone(),
            port: self.remote_port.clone(),
            last: last_err,
        })
    }

    /// Send the first `len` bytes of the buffer, looping over partial
    /// writes until all of them are out. Either every byte is confirmed
    /// sent or the call fails; the error reports how many bytes were
    /// still outstanding.
    pub fn send(&mut self, len: usize) -> Result<()> {
        const ORIGIN: &str = "send";
        let target = format!("{}:{}", self.remote_host, self.remote_port);

        self.diag
            .debug(ORIGIN, &format!("called to send {len} bytes to {target}"));
        self.check_len(ORIGIN, "send", len)?;
        self.require_state(ORIGIN, &[ConnState::Connected, ConnState::WriteClosed])?;

        let Some(stream) = self.stream.as_mut() else {
            return Err(EngineError::Usage(format!(
                "{ORIGIN} called with no attached stream"
            )));
        };

        let mut total = 0;
        while total < len {
            let remaining = len - total;
            match stream.send(&self.buffer[total..len]) {
                Ok(0) => {
                    let err = std::io::Error::from(std::io::ErrorKind::WriteZero);
                    self.diag.sys_error(
                        ORIGIN,
                        &err.to_string(),
                        &format!("unable to send {remaining} bytes to {target}"),
                    );
                    return Err(EngineError::transport(
                        format!("unable to send {remaining} bytes to {target}"),
                        err,
                    ));
                }
                Ok(count) => {
                    total += count;
                    self.diag.debug(
                        ORIGIN,
                        &format!("{count} bytes sent at once ({total} in total)"),
                    );
                }
                Err(err) => {
                    self.diag.sys_error(
                        ORIGIN,
                        &err.to_string(),
                        &format!("unable to send {remaining} bytes to {target}"),
                    );
                    return Err(EngineError::transport(
                        format!("unable to send {remaining} bytes to {target}"),
                        err,
                    ));
                }
            }
        }

        self.diag
            .debug(ORIGIN, &format!("sent {total} bytes to {target}, return"));
        Ok(())
    }

    /// Receive up to `max_len` bytes into the buffer with a single bounded
    /// read, returning however many bytes were obtained. Zero is a valid
    /// outcome and means the peer closed its write side.
    pub fn receive(&mut self, max_len: usize) -> Result<usize> {
        const ORIGIN: &str = "receive";
        let target = format!("{}:{}", self.remote_host, self.remote_port);

        self.diag.debug(
            ORIGIN,
            &format!("called to receive {max_len} bytes from {target}"),
        );
        self.check_len(ORIGIN, "receive", max_len)?;
        self.require_state(ORIGIN, &[ConnState::Connected, ConnState::WriteClosed])?;

        let Some(stream) = self.stream.as_mut() else {
            return Err(EngineError::Usage(format!(
                "{ORIGIN} called with no attached stream"
            )));
        };

        match stream.recv(&mut self.buffer[..max_len]) {
            Ok(count) => {
                self.diag.debug(
                    ORIGIN,
                    &format!("received {count} bytes from {target}, return"),
                );
                Ok(count)
            }
            Err(err) => {
                self.diag.sys_error(
                    ORIGIN,
                    &err.to_string(),
                    &format!("unable to receive {max_len} bytes from {target}"),
                );
                Err(EngineError::transport(
                    format!("unable to receive {max_len} bytes from {target}"),
                    err,
                ))
            }
        }
    }

    /// Shut down the outbound direction, signaling end-of-request to the
    /// peer while keeping the inbound direction readable.
    pub fn close_write(&mut self) -> Result<()> {
        const ORIGIN: &str = "close_write";
        let target = format!("{}:{}", self.remote_host, self.remote_port);

        self.diag.debug(
            ORIGIN,
            &format!("called to close write half of connection to {target}"),
        );
        self.require_state(ORIGIN, &[ConnState::Connected])?;

        let Some(stream) = self.stream.as_mut() else {
            return Err(EngineError::Usage(format!(
                "{ORIGIN} called with no attached stream"
            )));
        };

        if let Err(err) = stream.close_write() {
            self.diag.sys_error(
                ORIGIN,
                &err.to_string(),
                &format!("unable to close write half of connection to {target}"),
            );
            return Err(EngineError::transport(
                format!("unable to close write half of connection to {target}"),
                err,
            ));
        }

        self.state = ConnState::WriteClosed;
        self.diag.debug(
            ORIGIN,
            &format!("closed write half of connection to {target}, return"),
        );
        Ok(())
    }

    /// Release the stream. The connection enters [`ConnState::Closed`]
    /// even when the underlying close reports an error; the handle is
    /// gone either way.
    pub fn close(&mut self) -> Result<()> {
        const ORIGIN: &str = "close";
        let target = format!("{}:{}", self.remote_host, self.remote_port);

        self.diag
            .debug(ORIGIN, &format!("called to close connection to {target}"));
        self.require_state(ORIGIN, &[ConnState::Connected, ConnState::WriteClosed])?;

        let Some(stream) = self.stream.take() else {
            return Err(EngineError::Usage(format!(
                "{ORIGIN} called with no attached stream"
            )));
        };
        self.state = ConnState::Closed;

        if let Err(err) = stream.close() {
            self.diag.sys_error(
                ORIGIN,
                &err.to_string(),
                &format!("unable to close connection to {target}"),
            );
            return Err(EngineError::transport(
                format!("unable to close connection to {target}"),
                err,
            ));
        }

        self.diag
            .debug(ORIGIN, &format!("closed connection to {target}, return"));
        Ok(())
    }

    fn require_state(&self, origin: &str, allowed: &[ConnState]) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        let msg = format!("{origin} is not valid on a {} connection", self.state);
        self.diag.error(origin, &msg);
        Err(EngineError::Usage(msg))
    }

    fn check_len(&self, origin: &str, verb: &str, len: usize) -> Result<()> {
        if len == 0 {
            let msg = format!("bytes count to {verb} is 0");
            self.diag.error(origin, &msg);
            return Err(EngineError::Usage(msg));
        }
        if len > self.buffer.len() {
            let msg = format!(
                "bytes count to {verb} ({len}) > connection buffer size ({})",
                self.buffer.len()
            );
            self.diag.error(origin, &msg);
            return Err(EngineError::Usage(msg));
        }
        Ok(())
    }
}
