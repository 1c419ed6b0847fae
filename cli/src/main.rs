#![deny(warnings)]

//! Fetch one HTTP page over a raw TCP exchange and print the reply.

use {
    anyhow::{bail, Result},
    microget_engine::{Connection, DiagConfig, Diagnostics, Level},
    std::{
        env,
        io::{self, Write},
    },
};

const BUFFER_SIZE: usize = 10240;

fn http_get_request(host: &str) -> String {
    format!("GET / HTTP/1.1\r\nHost: {host}\r\n\r\n")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let (host, port) = match (args.next(), args.next()) {
        (Some(host), Some(port)) => (host, port),
        _ => bail!("usage: microget <host_name> <http_port>"),
    };

    let diag = Diagnostics::with_config(DiagConfig {
        min_level: Level::Debug,
        exit_on_error: true,
    });
    let mut conn = Connection::with_diagnostics(&host, &port, BUFFER_SIZE, diag);

    conn.connect()?;

    let request = http_get_request(&host);
    if request.len() > conn.capacity() {
        bail!(
            "request size ({}) > buffer size ({})",
            request.len(),
            conn.capacity()
        );
    }
    conn.buffer_mut()[..request.len()].copy_from_slice(request.as_bytes());

    conn.send(request.len())?;
    conn.close_write()?;

    // One bounded read without parsing headers; enough for small pages.
    let count = conn.receive(conn.capacity())?;
    io::stdout().write_all(&conn.buffer()[..count])?;

    conn.close()?;
    Ok(())
}
