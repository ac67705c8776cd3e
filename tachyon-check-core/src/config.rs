use crate::{
    DEFAULT_LOAD_LEVELS, DEFAULT_PAUSE, DEFAULT_PROBE_TIMEOUT, DEFAULT_PROXY_HOST,
    DEFAULT_PROXY_PORT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_UPSTREAM_HTTP, DEFAULT_UPSTREAM_HTTPS,
};
use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Proxy host is empty")]
    EmptyHost,

    #[error("Proxy port must be non-zero")]
    ZeroPort,

    #[error("Upstream URL `{url}` is invalid: {reason}")]
    InvalidUpstream { url: String, reason: String },
}

/// Where the proxy lives and where it forwards to.
///
/// Every component receives its own copy at construction; nothing reads global state.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub proxy_host: String,
    pub proxy_port: u16,
    /// Plain-scheme base URL of the echo service, e.g. `http://httpbin.org`
    pub upstream_http: String,
    /// Secure-scheme base URL of the echo service, reached through a CONNECT tunnel
    pub upstream_https: String,
    pub probe_timeout: Duration,
    pub scenario_pause: Duration,
    pub request_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            proxy_host: DEFAULT_PROXY_HOST.to_string(),
            proxy_port: DEFAULT_PROXY_PORT,
            upstream_http: DEFAULT_UPSTREAM_HTTP.to_string(),
            upstream_https: DEFAULT_UPSTREAM_HTTPS.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            scenario_pause: DEFAULT_PAUSE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl HarnessConfig {
    pub fn with_proxy(mut self, host: &str, port: u16) -> Self {
        self.proxy_host = host.to_string();
        self.proxy_port = port;
        self
    }

    pub fn with_upstream(mut self, http: &str, https: &str) -> Self {
        self.upstream_http = http.to_string();
        self.upstream_https = https.to_string();
        self
    }

    pub fn with_scenario_pause(mut self, pause: Duration) -> Self {
        self.scenario_pause = pause;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `host:port`, suitable for a raw TCP connect
    pub fn proxy_addr(&self) -> String {
        format!("{}:{}", self.proxy_host, self.proxy_port)
    }

    /// The proxy as an HTTP client expects it
    pub fn proxy_url(&self) -> String {
        format!("http://{}", self.proxy_addr())
    }

    pub fn http_url(&self, path: &str) -> String {
        join(&self.upstream_http, path)
    }

    pub fn https_url(&self, path: &str) -> String {
        join(&self.upstream_https, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proxy_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.proxy_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        for upstream in [&self.upstream_http, &self.upstream_https] {
            Url::parse(upstream).map_err(|err| ConfigError::InvalidUpstream {
                url: upstream.clone(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// One load level of the benchmark
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub request_count: NonZeroUsize,
    pub max_workers: NonZeroUsize,
    pub per_request_timeout: Duration,
}

impl BenchmarkConfig {
    pub fn new(request_count: NonZeroUsize, max_workers: NonZeroUsize) -> Self {
        Self {
            request_count,
            max_workers,
            per_request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_request_timeout = timeout;
        self
    }
}

/// The full benchmark run: which path to hit and at which load levels
#[derive(Clone, Debug)]
pub struct BenchmarkPlan {
    pub target_path: String,
    pub levels: Vec<BenchmarkConfig>,
    pub pause: Duration,
}

impl Default for BenchmarkPlan {
    fn default() -> Self {
        Self {
            target_path: "/get".to_string(),
            levels: DEFAULT_LOAD_LEVELS
                .iter()
                .map(|(count, workers)| BenchmarkConfig::new(*count, *workers))
                .collect(),
            pause: DEFAULT_PAUSE,
        }
    }
}
