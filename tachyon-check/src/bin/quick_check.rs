use std::process::ExitCode;
use tachyon_check::quick::quick_check;
use tachyon_check_core::HarnessConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tachyon_check::init_tracing();

    match quick_check(&HarnessConfig::default(), "/get").await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
