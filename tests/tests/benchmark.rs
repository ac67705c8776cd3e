mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use mock_proxy::{MockConfig, MockProxy};
    use std::time::Duration;
    use tachyon_check::benchmark::BenchmarkError;
    use tachyon_check::prelude::*;
    use tachyon_check_core::non_zero;

    #[tokio::test]
    #[ntest::timeout(20_000)]
    async fn default_levels_against_mock() {
        init();

        let proxy = MockProxy::spawn(MockConfig::default()).await.unwrap();
        let runner =
            BenchmarkRunner::new(local_config(proxy.port()), BenchmarkPlan::default()).unwrap();

        let stats = runner.run().await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].success_count, 10);
        assert_eq!(stats[1].success_count, 50);
        for level in &stats {
            assert_eq!(level.fail_count, 0);
            assert!(level.min_response_time <= level.avg_response_time);
            assert!(level.avg_response_time <= level.max_response_time);
        }
    }

    #[tokio::test]
    #[ntest::timeout(20_000)]
    async fn slow_target_bounds_throughput() {
        init();

        let proxy = MockProxy::spawn(MockConfig::default()).await.unwrap();
        let plan = BenchmarkPlan {
            target_path: "/delay/1".to_string(),
            levels: vec![BenchmarkConfig::new(non_zero(6), non_zero(3))],
            pause: Duration::ZERO,
        };
        let runner = BenchmarkRunner::new(local_config(proxy.port()), plan).unwrap();

        let stats = runner.run().await.unwrap();

        // Two waves of one-second requests
        let level = &stats[0];
        assert_eq!(level.success_count, 6);
        assert!(level.total_elapsed >= Duration::from_secs(2));
        assert!(level.requests_per_second <= 3.);
        assert!(level.min_response_time >= Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    #[ntest::timeout(5_000)]
    async fn unreachable_proxy_aborts() {
        init();

        let runner =
            BenchmarkRunner::new(local_config(closed_port().await), BenchmarkPlan::default())
                .unwrap();

        let result = runner.run().await;

        assert!(matches!(result, Err(BenchmarkError::Unreachable(_))));
    }
}
