//! Throughput and latency measurement at fixed load levels
use crate::driver::run_concurrent;
use crate::executor::{ExecuteOptions, ExecutorError, RequestExecutor};
use std::future::Future;
use std::time::Instant;
use tachyon_check_core::{
    BenchmarkConfig, BenchmarkPlan, BenchmarkStats, ConfigError, HarnessConfig, RequestError,
    RequestOutcome,
};
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Proxy unreachable: {0}")]
    Unreachable(RequestError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Runs a [`BenchmarkPlan`] against the proxy. Purely observational: there is no verdict, only
/// the stats of each level.
pub struct BenchmarkRunner {
    config: HarnessConfig,
    plan: BenchmarkPlan,
}

impl BenchmarkRunner {
    pub fn new(config: HarnessConfig, plan: BenchmarkPlan) -> Result<Self, BenchmarkError> {
        config.validate()?;
        Ok(Self { config, plan })
    }

    /// Send one diagnostic request, then measure every level in turn.
    ///
    /// A failed diagnostic request aborts the run before any level executes.
    pub async fn run(&self) -> Result<Vec<BenchmarkStats>, BenchmarkError> {
        let url = self.config.http_url(&self.plan.target_path);

        println!("Proxy Benchmark");
        println!("Proxy: {}", self.config.proxy_url());
        println!("Target: {url}");
        println!("{}", "-".repeat(50));

        println!("Testing single request...");
        let executor = RequestExecutor::new(&self.config, ExecuteOptions::default())?;
        let outcome = executor.get(&url).await;
        match outcome.result {
            Ok(_) => println!("Single request: {:.3}s", outcome.elapsed.as_secs_f64()),
            Err(err) => {
                println!("Single request failed: {err}");
                println!("Make sure the proxy is running!");
                return Err(BenchmarkError::Unreachable(err));
            }
        }
        println!("\n{}", "=".repeat(50));

        let mut all_stats = Vec::with_capacity(self.plan.levels.len());
        for (i, level) in self.plan.levels.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.plan.pause).await;
            }
            all_stats.push(self.run_level(level, &url).await?);
        }

        Ok(all_stats)
    }

    #[instrument(
        name = "level",
        skip(self, level, url),
        fields(requests = level.request_count.get(), workers = level.max_workers.get())
    )]
    pub async fn run_level(
        &self,
        level: &BenchmarkConfig,
        url: &str,
    ) -> Result<BenchmarkStats, BenchmarkError> {
        println!(
            "\nTest: {} requests, {} workers",
            level.request_count, level.max_workers
        );

        let executor = RequestExecutor::new(
            &self.config,
            ExecuteOptions::with_timeout(level.per_request_timeout),
        )?;
        let url = url.to_string();
        let stats = measure(
            move |_| {
                let executor = executor.clone();
                let url = url.clone();
                async move { executor.get(&url).await }
            },
            level,
        )
        .await;

        info!(
            success = stats.success_count,
            failed = stats.fail_count,
            "Level complete at {:.2} req/s",
            stats.requests_per_second
        );
        println!("{stats}");

        Ok(stats)
    }
}

/// Drive `task` at the given load level and compute its stats.
///
/// The elapsed time covers the whole batch, from first dispatch to last completion.
pub async fn measure<T, F>(task: T, level: &BenchmarkConfig) -> BenchmarkStats
where
    T: Fn(usize) -> F + Send + Sync + 'static + Clone,
    F: Future<Output = RequestOutcome> + Send + 'static,
{
    let start = Instant::now();
    let outcomes = run_concurrent(task, level.request_count.get(), level.max_workers).await;
    let total_elapsed = start.elapsed();

    BenchmarkStats::from_outcomes(&outcomes, total_elapsed)
}
