use crate::executor::{ExecuteOptions, RequestExecutor};
use reqwest::Method;
use serde_json::json;
use tachyon_check_core::{HarnessConfig, ScenarioResult};
use tracing::debug;

pub const NAME: &str = "method_coverage";

const MIN_SUCCESS_RATIO: f64 = 0.75;

pub async fn run(config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
    let executor = RequestExecutor::new(config, ExecuteOptions::default())?;
    let payload = json!({ "test": "data" });

    let methods = [
        (Method::GET, "/get"),
        (Method::POST, "/post"),
        (Method::PUT, "/put"),
        (Method::DELETE, "/delete"),
    ];

    let total = methods.len();
    let mut passed = 0;
    let mut report = Vec::with_capacity(total);
    for (method, path) in methods {
        let body = (method == Method::POST || method == Method::PUT).then_some(&payload);
        let outcome = executor
            .execute(method.clone(), &config.http_url(path), body)
            .await;

        let verdict = match (outcome.status(), outcome.error()) {
            (Some(status @ (200 | 201 | 202)), _) => {
                passed += 1;
                status.to_string()
            }
            (Some(status), _) => format!("{status} (unexpected)"),
            (None, Some(err)) => err.tag().to_string(),
            (None, None) => "no response".to_string(),
        };
        debug!("{method} {path}: {verdict}");
        report.push(format!("{method}:{verdict}"));
    }

    let ratio = passed as f64 / total as f64;
    Ok(ScenarioResult::new(
        NAME,
        ratio >= MIN_SUCCESS_RATIO,
        format!("{} ({:.0}% success rate)", report.join(" "), ratio * 100.),
    ))
}
