use std::process::ExitCode;
use tachyon_check::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    tachyon_check::init_tracing();

    let runner = match BenchmarkRunner::new(HarnessConfig::default(), BenchmarkPlan::default()) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runner.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Benchmark aborted: {err}");
            ExitCode::FAILURE
        }
    }
}
