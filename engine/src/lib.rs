#![deny(warnings)]

//! Bounded-buffer TCP request/response engine.
//!
//! The engine resolves a host/port pair into an ordered list of address
//! candidates, connects to the first one that accepts (closing each failed
//! candidate's endpoint before trying the next), and then drives one
//! request/response exchange over a caller-sized buffer: a fully-looped
//! send, an optional half-close of the write direction, and a single
//! bounded receive.
//!
//! Everything is synchronous and blocking; one [`Connection`] is owned by
//! one caller at a time. There are no timeouts: a stalled peer blocks the
//! calling thread.
//!
//! ```no_run
//! use microget_engine::Connection;
//!
//! # fn main() -> microget_engine::Result<()> {
//! let mut conn = Connection::new("example.com", "80", 10240);
//! conn.connect()?;
//!
//! let request = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! conn.buffer_mut()[..request.len()].copy_from_slice(request);
//! conn.send(request.len())?;
//! conn.close_write()?;
//!
//! let count = conn.receive(conn.capacity())?;
//! println!("{}", String::from_utf8_lossy(&conn.buffer()[..count]));
//! conn.close()?;
//! # Ok(())
//! # }
//! ```

mod conn;
pub mod diag;
mod error;
pub mod resolve;
pub mod transport;

pub use {
    conn::{ConnState, Connection},
    diag::{CaptureSink, DiagConfig, DiagSink, Diagnostics, Level, TracingSink},
    error::{EngineError, Result},
    resolve::{Candidate, Family, ResolveError, Resolver, SystemResolver},
    transport::{Endpoint, Stream, TcpTransport, Transport},
};
