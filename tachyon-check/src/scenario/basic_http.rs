use crate::executor::{ExecuteOptions, RequestExecutor};
use anyhow::Context;
use serde_json::Value;
use tachyon_check_core::{Classification, HarnessConfig, ScenarioResult};

pub const NAME: &str = "basic_http";

/// Plain GET through the proxy; the echoed body must be JSON with a `headers` key.
pub async fn run(config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
    let executor = RequestExecutor::new(config, ExecuteOptions::default())?;
    let outcome = executor.get(&config.http_url("/get")).await;

    let response = match (&outcome.result, outcome.classify()) {
        (Ok(response), Classification::Success(200)) => response,
        (Ok(response), _) => {
            return Ok(ScenarioResult::fail(
                NAME,
                format!("unexpected status {}", response.status),
            ))
        }
        (Err(err), _) => return Ok(ScenarioResult::fail(NAME, err.to_string())),
    };

    let body: Value =
        serde_json::from_slice(&response.body).context("response body is not JSON")?;
    if body.get("headers").is_some() {
        Ok(ScenarioResult::pass(NAME, "echoed request headers"))
    } else {
        Ok(ScenarioResult::fail(NAME, "response body has no headers key"))
    }
}
