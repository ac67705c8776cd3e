use bytes::Bytes;
use humantime::format_duration;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a proxied request produced no response.
///
/// The `Display` form is always `<tag>: <message>`, where the tag is stable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The proxy refused or dropped the connection
    #[error("proxy_rejected: {0}")]
    ProxyRejected(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("network: {0}")]
    Network(String),

    /// The task producing the request panicked
    #[error("aborted: {0}")]
    Aborted(String),
}

impl RequestError {
    pub fn tag(&self) -> &'static str {
        match self {
            RequestError::ProxyRejected(_) => "proxy_rejected",
            RequestError::Timeout(_) => "timeout",
            RequestError::Network(_) => "network",
            RequestError::Aborted(_) => "aborted",
        }
    }
}

/// A response which made it back through the proxy, whatever its status.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ProxiedResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// What the proxy did with a request, as a closed set scenario logic can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A 2xx response
    Success(u16),
    /// Any other response status not covered below
    UpstreamStatus(u16),
    /// 413 Payload Too Large
    RejectedTooLarge,
    /// 429 Too Many Requests
    RateLimited,
    ProxyRejected,
    Timeout,
    Transport,
}

impl Classification {
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Classification::ProxyRejected | Classification::RateLimited
        )
    }
}

/// The single record produced per request attempt.
///
/// A response of any status counts as a success; only transport-level failures do not.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub elapsed: Duration,
    pub result: Result<ProxiedResponse, RequestError>,
}

impl RequestOutcome {
    pub fn completed(elapsed: Duration, response: ProxiedResponse) -> Self {
        Self {
            elapsed,
            result: Ok(response),
        }
    }

    pub fn failed(elapsed: Duration, error: RequestError) -> Self {
        Self {
            elapsed,
            result: Err(error),
        }
    }

    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn status(&self) -> Option<u16> {
        self.result.as_ref().ok().map(|r| r.status)
    }

    pub fn size(&self) -> Option<usize> {
        self.result.as_ref().ok().map(ProxiedResponse::size)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.result.as_ref().ok().map(|r| &r.body)
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.result.as_ref().err()
    }

    pub fn classify(&self) -> Classification {
        match &self.result {
            Ok(ProxiedResponse { status: 413, .. }) => Classification::RejectedTooLarge,
            Ok(ProxiedResponse { status: 429, .. }) => Classification::RateLimited,
            Ok(ProxiedResponse { status, .. }) if (200..300).contains(status) => {
                Classification::Success(*status)
            }
            Ok(ProxiedResponse { status, .. }) => Classification::UpstreamStatus(*status),
            Err(RequestError::ProxyRejected(_)) => Classification::ProxyRejected,
            Err(RequestError::Timeout(_)) => Classification::Timeout,
            Err(RequestError::Network(_) | RequestError::Aborted(_)) => Classification::Transport,
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(response) => write!(
                f,
                "status={} size={}B elapsed={}",
                response.status,
                response.size(),
                format_duration(self.elapsed),
            ),
            Err(err) => write!(f, "{err} elapsed={}", format_duration(self.elapsed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> RequestOutcome {
        RequestOutcome::completed(Duration::from_millis(5), ProxiedResponse::new(status, "{}"))
    }

    #[test]
    fn test_success_invariant() {
        let ok = response(502);
        assert!(ok.success());
        assert_eq!(ok.status(), Some(502));
        assert_eq!(ok.size(), Some(2));
        assert!(ok.error().is_none());

        let failed = RequestOutcome::failed(
            Duration::from_secs(1),
            RequestError::Timeout("deadline elapsed".into()),
        );
        assert!(!failed.success());
        assert!(failed.status().is_none());
        assert!(failed.size().is_none());
        assert_eq!(failed.error().map(RequestError::tag), Some("timeout"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(response(200).classify(), Classification::Success(200));
        assert_eq!(response(202).classify(), Classification::Success(202));
        assert_eq!(response(404).classify(), Classification::UpstreamStatus(404));
        assert_eq!(response(413).classify(), Classification::RejectedTooLarge);
        assert_eq!(response(429).classify(), Classification::RateLimited);

        let rejected = RequestOutcome::failed(
            Duration::ZERO,
            RequestError::ProxyRejected("connection refused".into()),
        );
        assert_eq!(rejected.classify(), Classification::ProxyRejected);
        assert!(rejected.classify().is_rejection());

        let aborted = RequestOutcome::failed(Duration::ZERO, RequestError::Aborted("boom".into()));
        assert_eq!(aborted.classify(), Classification::Transport);
    }

    #[test]
    fn test_error_display_is_tagged() {
        let err = RequestError::ProxyRejected("connection reset".into());
        assert_eq!(err.to_string(), "proxy_rejected: connection reset");
        assert!(err.to_string().starts_with(err.tag()));
    }
}
