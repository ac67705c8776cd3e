mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use mock_proxy::{MockConfig, MockProxy};
    use std::num::NonZeroU32;
    use std::time::Duration;
    use tachyon_check::prelude::*;

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn full_suite_against_mock() {
        init();

        let proxy = MockProxy::spawn(MockConfig::default()).await.unwrap();
        let suite = ScenarioSuite::new(local_config(proxy.port())).unwrap();

        let SuiteRun::Completed(report) = suite.run().await else {
            panic!("Mock proxy reported as unreachable");
        };

        let failed: Vec<_> = report
            .results()
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.name())
            .collect();
        assert!(failed.is_empty(), "failed: {failed:?}");
        assert_eq!(report.passed_count(), 7);
        assert_eq!(report.success_rate(), 1.0);
        assert!(report.overall_pass());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            proxy.tunnel_requests(),
            vec!["CONNECT httpbin.org:443 HTTP/1.1"]
        );
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn full_suite_against_rate_limited_mock() {
        init();

        let proxy = MockProxy::spawn(
            MockConfig::default().with_rate_limit(NonZeroU32::new(25).unwrap()),
        )
        .await
        .unwrap();
        // A full second between scenarios refills the limiter
        let config = local_config(proxy.port()).with_scenario_pause(Duration::from_secs(1));
        let suite = ScenarioSuite::new(config).unwrap();

        let SuiteRun::Completed(report) = suite.run().await else {
            panic!("Mock proxy reported as unreachable");
        };

        let probe = report
            .results()
            .iter()
            .find(|r| r.name() == "rate_limit_probe")
            .unwrap();
        assert!(probe.passed());
        assert!(!probe.diagnostics().contains(" 0 rate limited"));
        assert!(report.overall_pass());
    }

    #[tokio::test]
    #[ntest::timeout(5_000)]
    async fn suite_against_refusing_address() {
        init();

        let suite = ScenarioSuite::new(local_config(closed_port().await)).unwrap();

        let run = suite.run().await;

        assert!(matches!(run, SuiteRun::Unreachable { .. }));
        assert_eq!(run.exit_code(), 1);
    }
}
