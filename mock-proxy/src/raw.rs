//! Bare TCP listeners with fixed behavior, for probing how a client copes with a proxy that
//! does not speak HTTP properly.
use socket2::SockRef;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error};

const HOLD_DURATION: Duration = Duration::from_secs(3600);

#[derive(Clone, Copy, Debug)]
pub enum RawBehavior {
    /// Read the request, write these bytes, close
    Reply(&'static [u8]),
    /// Read the request, close gracefully
    Close,
    /// Read the request, close with a TCP reset
    Reset,
    /// Read the request, never answer
    Hold,
}

pub struct RawStub {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RawStub {
    pub async fn spawn(behavior: RawBehavior) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            // NOTE: Dropping the set aborts in-flight connections along with the accept loop
            let mut connections = JoinSet::new();
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!("Raw stub accepted {peer} ({behavior:?})");
                        connections.spawn(async move {
                            if let Err(err) = serve(stream, behavior).await {
                                debug!("Raw stub connection error: {err}");
                            }
                        });
                    }
                    Err(err) => {
                        error!("Raw stub accept failed: {err}");
                        break;
                    }
                }
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for RawStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, behavior: RawBehavior) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    let _ = stream.read(&mut buf).await?;

    match behavior {
        RawBehavior::Reply(bytes) => {
            stream.write_all(bytes).await?;
            stream.shutdown().await?;
            drain(&mut stream, &mut buf).await?;
        }
        RawBehavior::Close => {
            stream.shutdown().await?;
            drain(&mut stream, &mut buf).await?;
        }
        RawBehavior::Reset => {
            SockRef::from(&stream).set_linger(Some(Duration::ZERO))?;
            drop(stream);
        }
        RawBehavior::Hold => {
            tokio::time::sleep(HOLD_DURATION).await;
        }
    }

    Ok(())
}

/// Read until the peer hangs up
async fn drain(stream: &mut TcpStream, buf: &mut [u8]) -> std::io::Result<()> {
    while stream.read(buf).await? > 0 {}
    Ok(())
}
