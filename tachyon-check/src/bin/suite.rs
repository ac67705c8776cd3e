use std::process::ExitCode;
use tachyon_check::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    tachyon_check::init_tracing();

    let suite = match ScenarioSuite::new(HarnessConfig::default()) {
        Ok(suite) => suite,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    ExitCode::from(suite.run().await.exit_code())
}
