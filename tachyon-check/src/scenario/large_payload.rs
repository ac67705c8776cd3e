use crate::executor::{ExecuteOptions, RequestExecutor};
use reqwest::Method;
use serde_json::json;
use std::time::Duration;
use tachyon_check_core::{Classification, HarnessConfig, ScenarioResult};

pub const NAME: &str = "large_payload";

const PAYLOAD_SIZE: usize = 100 * 1024;
const TIMEOUT: Duration = Duration::from_secs(30);

/// POST a 100KiB JSON body. Forwarding it and refusing it with 413 are equally acceptable.
pub async fn run(config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
    let executor = RequestExecutor::new(config, ExecuteOptions::with_timeout(TIMEOUT))?;
    let body = json!({ "data": "x".repeat(PAYLOAD_SIZE) });

    let outcome = executor
        .execute(Method::POST, &config.http_url("/post"), Some(&body))
        .await;

    let result = match outcome.classify() {
        Classification::Success(200) => ScenarioResult::pass(NAME, "payload forwarded"),
        Classification::RejectedTooLarge => ScenarioResult::pass(NAME, "rejected as too large"),
        _ => match (outcome.status(), outcome.error()) {
            (Some(status), _) => ScenarioResult::fail(NAME, format!("unexpected status {status}")),
            (None, Some(err)) => ScenarioResult::fail(NAME, err.to_string()),
            (None, None) => ScenarioResult::fail(NAME, "no response"),
        },
    };
    Ok(result)
}
