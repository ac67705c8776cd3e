use crate::executor::{ExecuteOptions, RequestExecutor};
use std::time::Duration;
use tachyon_check_core::{Classification, HarnessConfig, ScenarioResult};
use tracing::debug;

pub const NAME: &str = "rate_limit_probe";

const REQUESTS: usize = 50;
const SPACING: Duration = Duration::from_millis(10);
const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    successful: usize,
    rejected: usize,
    other: usize,
}

/// Fire a rapid sequential burst and record how the proxy reacts.
///
/// Observational only: the scenario passes whatever the tally, since a proxy with no rate
/// limit configured is as valid as one which throttles the burst.
pub async fn run(config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
    let executor = RequestExecutor::new(config, ExecuteOptions::with_timeout(TIMEOUT))?;
    let url = config.http_url("/get");

    let mut tally = Tally::default();
    for i in 0..REQUESTS {
        let outcome = executor.get(&url).await;
        match outcome.classify() {
            Classification::Success(200) => tally.successful += 1,
            c if c.is_rejection() => tally.rejected += 1,
            c => {
                debug!("Request {i} neither served nor rejected: {c:?}");
                tally.other += 1;
            }
        }
        tokio::time::sleep(SPACING).await;
    }

    Ok(ScenarioResult::pass(
        NAME,
        format!(
            "{} successful, {} rate limited, {} other",
            tally.successful, tally.rejected, tally.other
        ),
    ))
}
