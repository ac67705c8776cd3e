use crate::driver::run_concurrent;
use crate::executor::{ExecuteOptions, RequestExecutor};
use std::time::{Duration, Instant};
use tachyon_check_core::{non_zero, Classification, HarnessConfig, ScenarioResult};
use tracing::info;

pub const NAME: &str = "concurrent_load";

const REQUESTS: usize = 20;
const WORKERS: std::num::NonZeroUsize = non_zero(10);
const TIMEOUT: Duration = Duration::from_secs(15);
const MIN_SUCCESS_RATIO: f64 = 0.8;

/// Slow upstream requests in parallel; at least 80% of them must come back 200.
pub async fn run(config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
    let executor = RequestExecutor::new(config, ExecuteOptions::with_timeout(TIMEOUT))?;
    let base = config.http_url("/delay/1");

    let start = Instant::now();
    let outcomes = run_concurrent(
        move |i| {
            let executor = executor.clone();
            let url = format!("{base}?req={i}");
            async move { executor.get(&url).await }
        },
        REQUESTS,
        WORKERS,
    )
    .await;
    let elapsed = start.elapsed();

    let successful = outcomes
        .iter()
        .filter(|o| o.classify() == Classification::Success(200))
        .count();
    info!("{successful}/{REQUESTS} requests returned 200");

    let ratio = successful as f64 / REQUESTS as f64;
    Ok(ScenarioResult::new(
        NAME,
        ratio >= MIN_SUCCESS_RATIO,
        format!(
            "{successful}/{REQUESTS} successful in {:.2}s",
            elapsed.as_secs_f64()
        ),
    ))
}
