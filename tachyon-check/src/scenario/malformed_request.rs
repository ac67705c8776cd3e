use humantime::format_duration;
use std::time::Duration;
use tachyon_check_core::{HarnessConfig, ScenarioResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

pub const NAME: &str = "malformed_request";

const PAYLOAD: &[u8] = b"INVALID REQUEST LINE\r\n\r\n";
const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Write garbage straight onto a proxy connection.
///
/// Any reaction short of hanging the harness is acceptable: an error response, a graceful close
/// or a reset all pass, and a proxy which stays silent is cut off after [`IO_TIMEOUT`].
pub async fn run(config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
    let addr = config.proxy_addr();

    let diagnostics = match tokio::time::timeout(IO_TIMEOUT, exchange(&addr)).await {
        Ok(Ok(0)) => "connection closed without a response".to_string(),
        Ok(Ok(n)) => format!("answered with {n} bytes"),
        Ok(Err(err)) => format!("connection rejected: {err}"),
        Err(_) => format!("no response within {}", format_duration(IO_TIMEOUT)),
    };
    debug!("{diagnostics}");

    Ok(ScenarioResult::pass(NAME, diagnostics))
}

async fn exchange(addr: &str) -> std::io::Result<usize> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(PAYLOAD).await?;

    let mut buf = [0u8; 1024];
    stream.read(&mut buf).await
}
