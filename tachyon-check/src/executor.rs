use reqwest::{Client, Method, Proxy};
use serde_json::Value;
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tachyon_check_core::{HarnessConfig, ProxiedResponse, RequestError, RequestOutcome};
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid proxy address")]
    Proxy(#[source] reqwest::Error),

    #[error("Unable to build HTTP client")]
    Client(#[source] reqwest::Error),
}

/// Per-executor request options.
#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions {
    /// Overrides the config's request timeout
    pub timeout: Option<Duration>,
    /// Skip upstream certificate validation inside CONNECT tunnels
    pub accept_invalid_certs: bool,
}

impl ExecuteOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    pub fn insecure(mut self) -> Self {
        self.accept_invalid_certs = true;
        self
    }
}

/// Sends requests through the configured proxy, never failing past the outcome.
///
/// Every request is routed via the proxy, secure-scheme ones included: for those the client
/// first asks the proxy for a CONNECT tunnel. Cloning is cheap and shares the connection pool.
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    client: Client,
}

impl RequestExecutor {
    pub fn new(config: &HarnessConfig, options: ExecuteOptions) -> Result<Self, ExecutorError> {
        let proxy = Proxy::all(config.proxy_url()).map_err(ExecutorError::Proxy)?;
        let client = Client::builder()
            .proxy(proxy)
            .timeout(options.timeout.unwrap_or(config.request_timeout))
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(ExecutorError::Client)?;

        Ok(Self { client })
    }

    pub async fn get(&self, url: &str) -> RequestOutcome {
        self.execute(Method::GET, url, None).await
    }

    /// Send one request and time it from dispatch to the last body byte, or to the failure.
    pub async fn execute(&self, method: Method, url: &str, body: Option<&Value>) -> RequestOutcome {
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let start = Instant::now();
        let result = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                response
                    .bytes()
                    .await
                    .map(|body| ProxiedResponse::new(status, body))
                    .map_err(|err| classify_error(&err))
            }
            Err(err) => Err(classify_error(&err)),
        };
        let outcome = RequestOutcome {
            elapsed: start.elapsed(),
            result,
        };

        match outcome.error() {
            None => debug!("{method} {url}: {outcome} ({:?})", outcome.classify()),
            Some(_) => warn!("{method} {url}: {outcome}"),
        }

        outcome
    }
}

fn classify_error(err: &reqwest::Error) -> RequestError {
    let message = error_chain(err);

    if err.is_timeout() {
        RequestError::Timeout(message)
    } else if err.is_connect() || is_connection_drop(err) {
        RequestError::ProxyRejected(message)
    } else {
        RequestError::Network(message)
    }
}

/// The proxy hung up on us mid-exchange
fn is_connection_drop(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_proxy::raw::{RawBehavior, RawStub};
    use mock_proxy::{MockConfig, MockProxy};
    use serde_json::json;
    use tachyon_check_core::Classification;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config_for(port: u16) -> HarnessConfig {
        HarnessConfig::default().with_proxy("127.0.0.1", port)
    }

    #[tokio::test]
    async fn test_forwarded_through_proxy() {
        let proxy = MockProxy::spawn(MockConfig::default()).await.unwrap();
        let config = config_for(proxy.port());
        let executor = RequestExecutor::new(&config, ExecuteOptions::default()).unwrap();

        let outcome = executor.get(&config.http_url("/get")).await;

        assert!(outcome.success());
        assert_eq!(outcome.status(), Some(200));
        assert!(outcome.size().unwrap_or_default() > 0);
        assert_eq!(proxy.requests_served(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_still_success() {
        let proxy = MockProxy::spawn(MockConfig::default()).await.unwrap();
        let config = config_for(proxy.port());
        let executor = RequestExecutor::new(&config, ExecuteOptions::default()).unwrap();

        let outcome = executor.get(&config.http_url("/status/teapot")).await;

        assert!(outcome.success());
        assert_eq!(outcome.status(), Some(404));
        assert_eq!(outcome.classify(), Classification::UpstreamStatus(404));
    }

    #[tokio::test]
    async fn test_payload_too_large_classified() {
        let proxy = MockProxy::spawn(MockConfig::default().with_body_limit(1024))
            .await
            .unwrap();
        let config = config_for(proxy.port());
        let executor = RequestExecutor::new(&config, ExecuteOptions::default()).unwrap();
        let body = json!({ "data": "x".repeat(4 * 1024) });

        let outcome = executor
            .execute(Method::POST, &config.http_url("/post"), Some(&body))
            .await;

        assert_eq!(outcome.classify(), Classification::RejectedTooLarge);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_refused_is_proxy_rejection() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = config_for(port);
        let executor = RequestExecutor::new(&config, ExecuteOptions::default()).unwrap();

        let outcome = executor.get(&config.http_url("/get")).await;

        assert!(!outcome.success());
        assert_eq!(outcome.classify(), Classification::ProxyRejected);
        assert!(outcome
            .error()
            .unwrap()
            .to_string()
            .starts_with("proxy_rejected: "));
        assert!(logs_contain("proxy_rejected"));
    }

    #[tokio::test]
    #[ntest::timeout(5_000)]
    async fn test_silent_proxy_times_out() {
        let stub = RawStub::spawn(RawBehavior::Hold).await.unwrap();
        let config = config_for(stub.port());
        let executor = RequestExecutor::new(
            &config,
            ExecuteOptions::with_timeout(Duration::from_millis(300)),
        )
        .unwrap();

        let outcome = executor.get(&config.http_url("/get")).await;

        assert_eq!(outcome.classify(), Classification::Timeout);
        assert!(outcome.elapsed >= Duration::from_millis(300));
    }

    #[tokio::test]
    #[ntest::timeout(5_000)]
    async fn test_secure_scheme_tunnels_through_proxy() {
        let proxy = MockProxy::spawn(MockConfig::default()).await.unwrap();
        let config = config_for(proxy.port());
        let executor = RequestExecutor::new(&config, ExecuteOptions::default().insecure()).unwrap();

        let outcome = executor.get(&config.https_url("/get")).await;

        assert_eq!(outcome.status(), Some(200));
        let body: Value = serde_json::from_slice(outcome.body().unwrap()).unwrap();
        assert!(body.get("headers").is_some());
        assert_eq!(
            proxy.tunnel_requests(),
            vec!["CONNECT httpbin.org:443 HTTP/1.1"]
        );
    }

    #[tokio::test]
    #[ntest::timeout(5_000)]
    async fn test_secure_scheme_asks_for_tunnel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let first_line = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = stream.read(&mut buf).await.unwrap();
            stream
                .write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
            let head = String::from_utf8_lossy(&buf[..n]).into_owned();
            head.lines().next().unwrap_or_default().to_string()
        });
        let config = config_for(port);
        let executor = RequestExecutor::new(&config, ExecuteOptions::default().insecure()).unwrap();

        let outcome = executor.get(&config.https_url("/get")).await;

        assert_eq!(
            first_line.await.unwrap(),
            "CONNECT httpbin.org:443 HTTP/1.1"
        );
        assert_eq!(outcome.classify(), Classification::ProxyRejected);
    }

    #[test]
    fn test_invalid_proxy_error_chain() {
        let config = HarnessConfig::default().with_proxy("bad host", 8080);

        let err = RequestExecutor::new(&config, ExecuteOptions::default()).unwrap_err();

        assert!(matches!(err, ExecutorError::Proxy(_)));
        assert_eq!(err.to_string(), "Invalid proxy address");
        let cause = err.source().unwrap().to_string();
        assert!(!err.to_string().contains(&cause));
    }
}
