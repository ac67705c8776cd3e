//! Liveness check of the proxy endpoint
use humantime::format_duration;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

/// Attempt a bare TCP connection to `addr`. True iff it is accepted within `timeout`.
///
/// Never retries and never errors; every failure reads as "not running".
#[instrument(skip(timeout))]
pub async fn probe(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => {
            debug!("Proxy accepted connection");
            true
        }
        Ok(Err(err)) => {
            debug!("Proxy connection failed: {err}");
            false
        }
        Err(_) => {
            debug!("Proxy did not answer within {}", format_duration(timeout));
            false
        }
    }
}
