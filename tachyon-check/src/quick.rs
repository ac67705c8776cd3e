//! Single-request connectivity check
use crate::executor::{ExecuteOptions, ExecutorError, RequestExecutor};
use tachyon_check_core::{HarnessConfig, RequestError, PROXY_START_HINT};

/// One GET through the proxy. True iff any response came back, whatever its status.
pub async fn quick_check(config: &HarnessConfig, path: &str) -> Result<bool, ExecutorError> {
    println!("Testing proxy...");
    println!("Proxy URL: {}", config.proxy_url());

    let executor = RequestExecutor::new(config, ExecuteOptions::default())?;
    let outcome = executor.get(&config.http_url(path)).await;

    match outcome.result {
        Ok(response) => {
            println!("Success! Status: {}", response.status);
            println!("Response size: {} bytes", response.size());
            Ok(true)
        }
        Err(err @ RequestError::ProxyRejected(_)) => {
            println!("Proxy error: {err}");
            println!("Make sure the proxy is running with: {PROXY_START_HINT}");
            Ok(false)
        }
        Err(err) => {
            println!("Request error: {err}");
            Ok(false)
        }
    }
}
