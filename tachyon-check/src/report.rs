use tachyon_check_core::{ScenarioResult, SuiteReport};
use tracing::{info, warn};

/// Fold the ordered scenario verdicts into the suite report and print its summary.
pub fn aggregate(results: Vec<ScenarioResult>) -> SuiteReport {
    let report = SuiteReport::new(results);

    println!("\n{}", "=".repeat(50));
    println!("{report}");

    let rate = report.success_rate() * 100.;
    if report.overall_pass() {
        info!(passed = report.passed_count(), "Suite passed at {rate:.0}%");
    } else {
        warn!(passed = report.passed_count(), "Suite failed at {rate:.0}%");
    }

    report
}
