use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_PROXY_HOST: &str = "localhost";
pub const DEFAULT_PROXY_PORT: u16 = 8080;

pub const DEFAULT_UPSTREAM_HTTP: &str = "http://httpbin.org";
pub const DEFAULT_UPSTREAM_HTTPS: &str = "https://httpbin.org";

/// How long the availability probe waits for a TCP connect
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between two scenarios, and between two benchmark load levels
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The share of scenarios which must pass for the whole suite to pass
pub const SUITE_PASS_THRESHOLD: f64 = 0.8;

/// How an operator starts the proxy under test
pub const PROXY_START_HINT: &str = "cargo run";

/// `(requests, workers)` for each benchmark load level
pub const DEFAULT_LOAD_LEVELS: [(NonZeroUsize, NonZeroUsize); 2] = [
    (non_zero(10), non_zero(5)),
    (non_zero(50), non_zero(10)),
];

/// Compile-time `NonZeroUsize`; a zero argument fails the build.
pub const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("value must be non-zero"),
    }
}
