use crate::executor::{ExecuteOptions, RequestExecutor};
use tachyon_check_core::{HarnessConfig, ScenarioResult};

pub const NAME: &str = "https_connect";

/// GET a secure-scheme URL, which the client can only reach through a CONNECT tunnel.
/// Certificate validation is off since the tunnel, not the upstream, is under test.
pub async fn run(config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
    let executor = RequestExecutor::new(config, ExecuteOptions::default().insecure())?;
    let outcome = executor.get(&config.https_url("/get")).await;

    let result = match (outcome.status(), outcome.error()) {
        (Some(200), _) => ScenarioResult::pass(NAME, "tunnel established"),
        (Some(status), _) => ScenarioResult::fail(NAME, format!("unexpected status {status}")),
        (None, Some(err)) => ScenarioResult::fail(NAME, err.to_string()),
        (None, None) => ScenarioResult::fail(NAME, "no response"),
    };
    Ok(result)
}
