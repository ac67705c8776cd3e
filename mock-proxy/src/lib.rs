//! A stand-in forward proxy for exercising the harness without a real proxy or network.
//!
//! A front listener speaks the proxy side of the protocol. Plain-scheme requests arrive in
//! absolute form (`GET http://httpbin.org/get`) and are relayed to an axum app which matches on
//! the path alone and answers like the httpbin echo service would. CONNECT requests get a tunnel
//! to a TLS copy of the same app, served with a bundled self-signed certificate.
use axum::{
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

pub mod raw;
mod tunnel;

const MAX_DELAY_SECS: u64 = 10;

const CERT_PEM: &[u8] = include_bytes!("../certs/cert.pem");
const KEY_PEM: &[u8] = include_bytes!("../certs/key.pem");

#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    /// Bodies above this size are answered with 413
    pub body_limit: Option<usize>,
    /// Requests above this rate are answered with 429
    pub rate_limit: Option<NonZeroU32>,
}

impl MockConfig {
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    pub fn with_rate_limit(mut self, tps: NonZeroU32) -> Self {
        self.rate_limit = Some(tps);
        self
    }
}

struct MockState {
    limiter: Option<DefaultDirectRateLimiter>,
    body_limit: Option<usize>,
    served: AtomicU64,
    tunnels: Mutex<Vec<String>>,
}

impl MockState {
    fn new(config: &MockConfig) -> Self {
        Self {
            limiter: config.rate_limit.map(rate_limiter),
            body_limit: config.body_limit,
            served: AtomicU64::new(0),
            tunnels: Mutex::new(vec![]),
        }
    }

    fn record_tunnel(&self, request_line: String) {
        let mut tunnels = self.tunnels.lock().unwrap_or_else(|e| e.into_inner());
        tunnels.push(request_line);
    }
}

/// A running mock proxy on an ephemeral local port. Stops when dropped.
pub struct MockProxy {
    port: u16,
    state: Arc<MockState>,
    tasks: JoinSet<()>,
}

impl MockProxy {
    pub async fn spawn(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let (state, tasks) = start(listener, &config).await?;
        debug!("Mock proxy listening on port {port}");

        Ok(Self { port, state, tasks })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Requests which reached a route, rate-limited ones included
    pub fn requests_served(&self) -> u64 {
        self.state.served.load(Ordering::Relaxed)
    }

    /// Request lines of the CONNECTs which got a tunnel, in arrival order
    pub fn tunnel_requests(&self) -> Vec<String> {
        self.state
            .tunnels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Drop for MockProxy {
    fn drop(&mut self) {
        self.tasks.abort_all();
    }
}

pub async fn run(addr: SocketAddr, config: MockConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    let (_state, mut tasks) = start(listener, &config).await?;

    while let Some(result) = tasks.join_next().await {
        if let Err(err) = result {
            error!("Mock proxy task lost: {err}");
        }
    }
    Ok(())
}

/// Bring up both backends on ephemeral ports, then the proxy front on `front`.
async fn start(
    front: TcpListener,
    config: &MockConfig,
) -> std::io::Result<(Arc<MockState>, JoinSet<()>)> {
    let state = Arc::new(MockState::new(config));
    let app = router(state.clone());
    let mut tasks = JoinSet::new();

    let plain = TcpListener::bind("127.0.0.1:0").await?;
    let plain_addr = plain.local_addr()?;
    let plain_app = app.clone();
    tasks.spawn(async move {
        if let Err(err) = axum::serve(plain, plain_app).await {
            error!("Plain backend stopped: {err}");
        }
    });

    let secure = std::net::TcpListener::bind("127.0.0.1:0")?;
    secure.set_nonblocking(true)?;
    let secure_addr = secure.local_addr()?;
    let tls = RustlsConfig::from_pem(CERT_PEM.to_vec(), KEY_PEM.to_vec()).await?;
    tasks.spawn(async move {
        if let Err(err) = axum_server::from_tcp_rustls(secure, tls)
            .serve(app.into_make_service())
            .await
        {
            error!("TLS backend stopped: {err}");
        }
    });

    let backends = tunnel::Backends {
        plain: plain_addr,
        secure: secure_addr,
    };
    tasks.spawn(tunnel::accept_loop(front, backends, state.clone()));

    Ok((state, tasks))
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/get", get(echo))
        .route("/post", post(echo_body))
        .route("/put", put(echo_body))
        .route("/delete", delete(echo))
        .route("/delay/:secs", get(delay))
        .layer(middleware::from_fn_with_state(state, gate))
        .layer(TraceLayer::new_for_http())
}

async fn gate(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    state.served.fetch_add(1, Ordering::Relaxed);

    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            debug!("Rate limited {}", request.uri());
            return StatusCode::TOO_MANY_REQUESTS.into_response();
        }
    }

    let Some(limit) = state.body_limit else {
        return next.run(request).await;
    };

    // NOTE: The body is drained in full before any 413 goes out
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Unreadable body on {}: {err}", parts.uri);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if bytes.len() > limit {
        debug!("Rejected {}B body on {}", bytes.len(), parts.uri);
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn echo(uri: Uri, headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "args": {},
        "headers": header_map(&headers),
        "url": uri.to_string(),
    }))
}

async fn echo_body(uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let parsed = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    Json(json!({
        "args": {},
        "headers": header_map(&headers),
        "url": uri.to_string(),
        "data": String::from_utf8_lossy(&body),
        "json": parsed,
    }))
}

async fn delay(Path(secs): Path<u64>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(secs.min(MAX_DELAY_SECS))).await;
    echo(uri, headers).await
}

fn header_map(headers: &HeaderMap) -> Value {
    let map: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or_default().to_string();
            (name.as_str().to_string(), Value::String(value))
        })
        .collect();
    Value::Object(map)
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}
