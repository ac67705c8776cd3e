use crate::{RequestOutcome, SUITE_PASS_THRESHOLD};
use humantime::format_duration;
use std::fmt;
use std::time::Duration;

const SAMPLE_ERROR_COUNT: usize = 3;

/// Verdict of a single conformance scenario. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    name: String,
    passed: bool,
    diagnostics: String,
}

impl ScenarioResult {
    pub fn pass(name: &str, diagnostics: impl Into<String>) -> Self {
        Self::new(name, true, diagnostics)
    }

    pub fn fail(name: &str, diagnostics: impl Into<String>) -> Self {
        Self::new(name, false, diagnostics)
    }

    pub fn new(name: &str, passed: bool, diagnostics: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }
}

/// Scenario verdicts in run order, plus the overall verdict derived from them.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    results: Vec<ScenarioResult>,
}

impl SuiteReport {
    pub fn new(results: Vec<ScenarioResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Share of passed scenarios, in `[0, 1]`. An empty report has a rate of 0.
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.;
        }
        self.passed_count() as f64 / self.results.len() as f64
    }

    pub fn overall_pass(&self) -> bool {
        self.success_rate() >= SUITE_PASS_THRESHOLD
    }

    pub fn exit_code(&self) -> u8 {
        if self.overall_pass() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test Results Summary:")?;
        for result in &self.results {
            let status = if result.passed() { "PASS" } else { "FAIL" };
            writeln!(f, "  {}: {status}", result.name())?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Overall Success Rate: {:.0}%",
            self.success_rate() * 100.
        )?;
        if self.overall_pass() {
            write!(f, "Proxy is working well!")
        } else {
            write!(f, "Some issues detected")
        }
    }
}

/// Throughput and latency of one benchmark load level.
///
/// Latencies only cover successful requests; a batch where everything failed has none.
#[derive(Debug, Clone)]
pub struct BenchmarkStats {
    pub success_count: usize,
    pub fail_count: usize,
    pub avg_response_time: Option<Duration>,
    pub min_response_time: Option<Duration>,
    pub max_response_time: Option<Duration>,
    pub total_elapsed: Duration,
    pub requests_per_second: f64,
    pub sample_errors: Vec<String>,
}

impl BenchmarkStats {
    pub fn from_outcomes(outcomes: &[RequestOutcome], total_elapsed: Duration) -> Self {
        let latencies: Vec<f64> = outcomes
            .iter()
            .filter(|o| o.success())
            .map(|o| o.elapsed.as_secs_f64())
            .collect();
        let success_count = latencies.len();
        let fail_count = outcomes.len() - success_count;

        let (avg, min, max) = if latencies.is_empty() {
            (None, None, None)
        } else {
            let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
            let max = latencies.iter().copied().fold(0., f64::max);
            (
                Some(Duration::from_secs_f64(statistical::mean(&latencies))),
                Some(Duration::from_secs_f64(min)),
                Some(Duration::from_secs_f64(max)),
            )
        };

        let requests_per_second = if total_elapsed.is_zero() {
            0.
        } else {
            success_count as f64 / total_elapsed.as_secs_f64()
        };

        let sample_errors = outcomes
            .iter()
            .filter_map(RequestOutcome::error)
            .take(SAMPLE_ERROR_COUNT)
            .map(ToString::to_string)
            .collect();

        Self {
            success_count,
            fail_count,
            avg_response_time: avg,
            min_response_time: min,
            max_response_time: max,
            total_elapsed,
            requests_per_second,
            sample_errors,
        }
    }
}

impl fmt::Display for BenchmarkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(avg), Some(min), Some(max)) = (
            self.avg_response_time,
            self.min_response_time,
            self.max_response_time,
        ) else {
            write!(f, "All requests failed!")?;
            if !self.sample_errors.is_empty() {
                write!(f, "\nErrors: {:?}", self.sample_errors)?;
            }
            return Ok(());
        };

        writeln!(f, "Successful requests: {}", self.success_count)?;
        writeln!(f, "Failed requests: {}", self.fail_count)?;
        writeln!(f, "Average response time: {:.3}s", avg.as_secs_f64())?;
        writeln!(f, "Min response time: {:.3}s", min.as_secs_f64())?;
        writeln!(f, "Max response time: {:.3}s", max.as_secs_f64())?;
        writeln!(f, "Total time: {}", format_duration(self.total_elapsed))?;
        write!(f, "Requests per second: {:.2}", self.requests_per_second)?;
        if !self.sample_errors.is_empty() {
            write!(f, "\nErrors: {:?}", self.sample_errors)?;
        }
        Ok(())
    }
}
