//! Black-box conformance and load testing for HTTP/HTTPS forward proxies.
//!
//! The proxy is only ever reached over the network. [`probe`] gates a run,
//! [`ScenarioSuite`] runs the seven conformance checks and [`report::aggregate`] turns their
//! verdicts into an exit status. [`BenchmarkRunner`] measures throughput on its own.
pub mod benchmark;
pub mod driver;
pub mod executor;
pub mod probe;
pub mod quick;
pub mod report;
pub mod scenario;

pub use benchmark::BenchmarkRunner;
pub use driver::{run_concurrent, WorkerPool};
pub use executor::{ExecuteOptions, RequestExecutor};
pub use probe::probe;
pub use scenario::{ScenarioKind, ScenarioSuite, SuiteRun};

pub mod prelude {
    pub use crate::benchmark::BenchmarkRunner;
    pub use crate::executor::{ExecuteOptions, RequestExecutor};
    pub use crate::scenario::{ScenarioSuite, SuiteRun};
    pub use tachyon_check_core::{
        BenchmarkConfig, BenchmarkPlan, BenchmarkStats, HarnessConfig, RequestOutcome,
        ScenarioResult, SuiteReport,
    };
}

/// Install the fmt subscriber used by every binary. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tachyon_check=info"));

    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
