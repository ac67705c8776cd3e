//! The proxy-facing front: CONNECT gets a tunnel to the TLS backend, anything else is relayed
//! byte for byte to the plain backend.
use crate::MockState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{copy_bidirectional, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error};

const MAX_HEAD: usize = 16 * 1024;
const ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection established\r\n\r\n";

#[derive(Clone, Copy, Debug)]
pub(crate) struct Backends {
    pub plain: SocketAddr,
    pub secure: SocketAddr,
}

pub(crate) async fn accept_loop(listener: TcpListener, backends: Backends, state: Arc<MockState>) {
    let mut connections = JoinSet::new();
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let state = state.clone();
                connections.spawn(async move {
                    if let Err(err) = relay(stream, backends, &state).await {
                        debug!("Relay for {peer} ended: {err}");
                    }
                });
            }
            Err(err) => {
                error!("Mock proxy accept failed: {err}");
                break;
            }
        }
    }
}

async fn relay(
    mut client: TcpStream,
    backends: Backends,
    state: &MockState,
) -> std::io::Result<()> {
    let mut head = Vec::with_capacity(1024);

    let Some(line_end) = read_until(&mut client, &mut head, b"\r\n").await? else {
        return Ok(());
    };
    let request_line = String::from_utf8_lossy(&head[..line_end]).into_owned();

    if !request_line.starts_with("CONNECT ") {
        let mut upstream = TcpStream::connect(backends.plain).await?;
        upstream.write_all(&head).await?;
        copy_bidirectional(&mut client, &mut upstream).await?;
        return Ok(());
    }

    let Some(head_end) = read_until(&mut client, &mut head, b"\r\n\r\n").await? else {
        return Ok(());
    };
    debug!("Opening tunnel for `{request_line}`");
    state.record_tunnel(request_line);

    let mut upstream = TcpStream::connect(backends.secure).await?;
    client.write_all(ESTABLISHED).await?;
    let early = &head[head_end + 4..];
    if !early.is_empty() {
        upstream.write_all(early).await?;
    }
    copy_bidirectional(&mut client, &mut upstream).await?;

    Ok(())
}

/// Read into `buf` until `needle` shows up and return its offset. `None` if the client hung up
/// first or sent an oversized head.
async fn read_until(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
    needle: &[u8],
) -> std::io::Result<Option<usize>> {
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(pos) = buf.windows(needle.len()).position(|w| w == needle) {
            return Ok(Some(pos));
        }
        if buf.len() > MAX_HEAD {
            return Ok(None);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
