//! The conformance suite and its fixed scenario order
mod basic_http;
mod concurrent_load;
mod https_connect;
mod large_payload;
mod malformed_request;
mod method_coverage;
mod rate_limit_probe;

use crate::driver::panic_message;
use crate::probe::probe;
use crate::report;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use tachyon_check_core::{
    ConfigError, HarnessConfig, ScenarioResult, SuiteReport, PROXY_START_HINT,
};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioKind {
    BasicHttp,
    HttpsConnect,
    ConcurrentLoad,
    RateLimitProbe,
    MalformedRequest,
    LargePayload,
    MethodCoverage,
}

impl ScenarioKind {
    /// Every scenario, in the order the suite runs them
    pub const ALL: [ScenarioKind; 7] = [
        ScenarioKind::BasicHttp,
        ScenarioKind::HttpsConnect,
        ScenarioKind::ConcurrentLoad,
        ScenarioKind::RateLimitProbe,
        ScenarioKind::MalformedRequest,
        ScenarioKind::LargePayload,
        ScenarioKind::MethodCoverage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::BasicHttp => basic_http::NAME,
            ScenarioKind::HttpsConnect => https_connect::NAME,
            ScenarioKind::ConcurrentLoad => concurrent_load::NAME,
            ScenarioKind::RateLimitProbe => rate_limit_probe::NAME,
            ScenarioKind::MalformedRequest => malformed_request::NAME,
            ScenarioKind::LargePayload => large_payload::NAME,
            ScenarioKind::MethodCoverage => method_coverage::NAME,
        }
    }

    async fn run(self, config: &HarnessConfig) -> anyhow::Result<ScenarioResult> {
        match self {
            ScenarioKind::BasicHttp => basic_http::run(config).await,
            ScenarioKind::HttpsConnect => https_connect::run(config).await,
            ScenarioKind::ConcurrentLoad => concurrent_load::run(config).await,
            ScenarioKind::RateLimitProbe => rate_limit_probe::run(config).await,
            ScenarioKind::MalformedRequest => malformed_request::run(config).await,
            ScenarioKind::LargePayload => large_payload::run(config).await,
            ScenarioKind::MethodCoverage => method_coverage::run(config).await,
        }
    }
}

/// How a gated suite run ended
#[derive(Debug)]
pub enum SuiteRun {
    /// The availability probe failed; no scenario ran
    Unreachable { addr: String },
    Completed(SuiteReport),
}

impl SuiteRun {
    pub fn exit_code(&self) -> u8 {
        match self {
            SuiteRun::Unreachable { .. } => 1,
            SuiteRun::Completed(report) => report.exit_code(),
        }
    }
}

pub struct ScenarioSuite {
    config: HarnessConfig,
}

impl ScenarioSuite {
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Probe the proxy, and only if it answers run every scenario and aggregate the verdicts.
    pub async fn run(&self) -> SuiteRun {
        let addr = self.config.proxy_addr();
        println!("Checking if proxy is running on {addr}...");

        if !probe(&addr, self.config.probe_timeout).await {
            println!("Proxy not running on {addr}");
            println!("Please start the proxy with: {PROXY_START_HINT}");
            return SuiteRun::Unreachable { addr };
        }
        println!("Proxy detected on {addr}");

        let results = self.run_all().await;
        debug_assert_eq!(results.len(), ScenarioKind::ALL.len());
        SuiteRun::Completed(report::aggregate(results))
    }

    /// Run the scenarios one after the other, with the configured pause between two of them.
    pub async fn run_all(&self) -> Vec<ScenarioResult> {
        println!("Starting comprehensive proxy tests");

        let mut results = Vec::with_capacity(ScenarioKind::ALL.len());
        for (i, kind) in ScenarioKind::ALL.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.scenario_pause).await;
            }
            println!("\n{}", "=".repeat(50));
            results.push(self.run_one(kind).await);
        }
        results
    }

    /// Run a single scenario. Errors and panics inside it become a failed result.
    #[instrument(name = "scenario", skip(self), fields(name = kind.name()))]
    pub async fn run_one(&self, kind: ScenarioKind) -> ScenarioResult {
        info!("Running scenario");

        let result = match AssertUnwindSafe(kind.run(&self.config))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!("Scenario crashed: {err:#}");
                ScenarioResult::fail(kind.name(), format!("crashed: {err:#}"))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Scenario panicked: {message}");
                ScenarioResult::fail(kind.name(), format!("crashed: {message}"))
            }
        };

        let status = if result.passed() { "PASS" } else { "FAIL" };
        println!("{}: {status} ({})", result.name(), result.diagnostics());
        info!(passed = result.passed(), "Scenario complete");

        result
    }
}
