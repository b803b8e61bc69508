//! Known-answer equivalence checks and throughput measurement.
//!
//! The equivalence check never stops at the first disagreement: every
//! (backend, input) pair gets its own [`Finding`], so a caller can see exactly
//! which backend diverges and on which address. Benchmarks measure one
//! anonymizer at a time and never compare rates across backends.

use std::collections::BTreeSet;
use std::fmt;
use std::hint::black_box;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{info, warn};

use crate::anonymizer::Anonymizer;
use crate::backend::BackendId;
use crate::error::{Error, Result};
use crate::registry::Registry;

/// Iterations used when none are configured.
pub const DEFAULT_ITERATIONS: u64 = 10_000;

/// Address anonymized repeatedly by benchmarks.
pub const DEFAULT_PROBE: &str = "192.0.2.1";

/// One `(key, input) -> expected` fixture.
///
/// The key is given as text and used as raw bytes, so it must be exactly 32
/// bytes long.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KnownAnswer {
    pub key: String,
    pub input: String,
    pub expected: String,
}

/// Result of one backend on one known-answer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Match,
    Mismatch { actual: String },
    Failed(Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub backend: BackendId,
    pub input: String,
    pub expected: String,
    pub outcome: Outcome,
}

impl Finding {
    pub fn is_match(&self) -> bool {
        self.outcome == Outcome::Match
    }

    /// The error describing this finding, if it is not a match.
    pub fn to_error(&self) -> Option<Error> {
        match &self.outcome {
            Outcome::Match => None,
            Outcome::Mismatch { actual } => Some(Error::EquivalenceMismatch {
                backend: self.backend,
                input: self.input.clone(),
                expected: self.expected.clone(),
                actual: actual.clone(),
            }),
            Outcome::Failed(err) => Some(err.clone()),
        }
    }
}

/// Every finding of an equivalence run, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquivalenceReport {
    findings: Vec<Finding>,
}

impl EquivalenceReport {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn findings_for(&self, backend: BackendId) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.backend == backend)
    }

    /// `true` when every backend produced every expected output.
    pub fn is_consistent(&self) -> bool {
        self.findings.iter().all(Finding::is_match)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.outcome, Outcome::Mismatch { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.outcome, Outcome::Failed(_)))
    }

    /// Backends with at least one mismatch or failure.
    pub fn divergent_backends(&self) -> BTreeSet<BackendId> {
        self.findings
            .iter()
            .filter(|f| !f.is_match())
            .map(|f| f.backend)
            .collect()
    }

    /// One error per non-matching finding.
    pub fn errors(&self) -> Vec<Error> {
        self.findings.iter().filter_map(Finding::to_error).collect()
    }

    fn record(&mut self, finding: Finding) {
        match &finding.outcome {
            Outcome::Match => {}
            Outcome::Mismatch { actual } => warn!(
                backend = %finding.backend,
                input = %finding.input,
                expected = %finding.expected,
                %actual,
                "backend output differs from known answer"
            ),
            Outcome::Failed(err) => warn!(
                backend = %finding.backend,
                input = %finding.input,
                error = %err,
                "backend failed on known answer"
            ),
        }
        self.findings.push(finding);
    }
}

/// Runs every `(input, expected)` case through every anonymizer.
///
/// All anonymizers are expected to share one key.
pub fn check_equivalence(anonymizers: &[Anonymizer], cases: &[(&str, &str)]) -> EquivalenceReport {
    let mut report = EquivalenceReport::default();
    for anonymizer in anonymizers {
        for &(input, expected) in cases {
            let outcome = evaluate(anonymizer, input, expected);
            report.record(Finding {
                backend: anonymizer.backend(),
                input: input.to_owned(),
                expected: expected.to_owned(),
                outcome,
            });
        }
    }
    report
}

fn evaluate(anonymizer: &Anonymizer, input: &str, expected: &str) -> Outcome {
    match anonymizer.anonymize_str(input) {
        Ok(actual) => {
            let actual = actual.unwrap_or_default();
            if actual == expected {
                Outcome::Match
            } else {
                Outcome::Mismatch { actual }
            }
        }
        Err(err) => Outcome::Failed(err),
    }
}

/// How the rate of a benchmark came out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    /// Anonymizations per second.
    PerSecond(f64),
    /// Elapsed time was too small to divide by, or nothing was run.
    Unmeasurable,
}

impl Rate {
    fn compute(iterations: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        if iterations == 0 || secs <= 0.0 {
            return Rate::Unmeasurable;
        }
        let rate = iterations as f64 / secs;
        if rate.is_finite() {
            Rate::PerSecond(rate)
        } else {
            Rate::Unmeasurable
        }
    }

    pub fn per_second(&self) -> Option<f64> {
        match self {
            Rate::PerSecond(rate) => Some(*rate),
            Rate::Unmeasurable => None,
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::PerSecond(rate) => write!(f, "{rate:.0} anonymizations/s"),
            Rate::Unmeasurable => f.write_str("unmeasurable"),
        }
    }
}

/// Outcome of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    backend: BackendId,
    iterations: u64,
    elapsed: Duration,
    rate: Rate,
}

impl BenchmarkResult {
    pub fn new(backend: BackendId, iterations: u64, elapsed: Duration) -> Self {
        Self {
            backend,
            iterations,
            elapsed,
            rate: Rate::compute(iterations, elapsed),
        }
    }

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} anonymizations in {:?} ({})",
            self.backend, self.iterations, self.elapsed, self.rate
        )
    }
}

/// Anonymizes `probe` `iterations` times and measures wall-clock time.
///
/// The probe is checked once before timing starts, so an address the backend
/// cannot handle fails fast instead of being timed.
pub fn benchmark(anonymizer: &Anonymizer, iterations: u64, probe: &str) -> Result<BenchmarkResult> {
    anonymizer.anonymize_str(probe)?;

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(anonymizer.anonymize_str(black_box(probe))?);
    }
    let result = BenchmarkResult::new(anonymizer.backend(), iterations, start.elapsed());

    info!(
        backend = %result.backend,
        iterations = result.iterations,
        elapsed = ?result.elapsed,
        rate = %result.rate,
        "benchmark finished"
    );
    Ok(result)
}

/// Settings for a [`Harness`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub iterations: u64,
    pub probe: String,
    pub backends: Vec<BackendId>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            probe: DEFAULT_PROBE.to_owned(),
            backends: BackendId::ALL.to_vec(),
        }
    }
}

impl HarnessConfig {
    /// Default settings restricted to the backends `registry` found usable.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            backends: registry.available().collect(),
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_probe(mut self, probe: impl Into<String>) -> Self {
        self.probe = probe.into();
        self
    }

    pub fn with_backends(mut self, backends: impl IntoIterator<Item = BackendId>) -> Self {
        self.backends = backends.into_iter().collect();
        self
    }
}

/// Drives equivalence checks and benchmarks over a configured set of backends.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Checks known-answer fixtures against every configured backend.
    ///
    /// Fixtures are grouped by key and one anonymizer is built per
    /// (key, backend). If that construction fails, each of the key's fixtures
    /// is recorded as a failure for that backend and the run goes on.
    pub fn check_fixtures(&self, fixtures: &[KnownAnswer]) -> EquivalenceReport {
        let mut groups: Vec<(&str, Vec<(&str, &str)>)> = Vec::new();
        for fixture in fixtures {
            let case = (fixture.input.as_str(), fixture.expected.as_str());
            match groups.iter_mut().find(|(key, _)| *key == fixture.key) {
                Some((_, cases)) => cases.push(case),
                None => groups.push((fixture.key.as_str(), vec![case])),
            }
        }

        let mut report = EquivalenceReport::default();
        for &backend in &self.config.backends {
            for (key, cases) in &groups {
                match Anonymizer::new(key.as_bytes(), backend) {
                    Ok(anonymizer) => {
                        let partial = check_equivalence(std::slice::from_ref(&anonymizer), cases);
                        report.findings.extend(partial.findings);
                    }
                    Err(err) => {
                        for &(input, expected) in cases {
                            report.record(Finding {
                                backend,
                                input: input.to_owned(),
                                expected: expected.to_owned(),
                                outcome: Outcome::Failed(err.clone()),
                            });
                        }
                    }
                }
            }
        }
        report
    }

    /// Builds one anonymizer per configured backend for `key`.
    ///
    /// Backends that fail to construct are returned alongside their error.
    pub fn anonymizers(&self, key: &[u8]) -> (Vec<Anonymizer>, Vec<(BackendId, Error)>) {
        let mut built = Vec::new();
        let mut failed = Vec::new();
        for &backend in &self.config.backends {
            match Anonymizer::new(key, backend) {
                Ok(anonymizer) => built.push(anonymizer),
                Err(err) => failed.push((backend, err)),
            }
        }
        (built, failed)
    }

    /// Benchmarks each anonymizer with the configured iterations and probe.
    pub fn benchmark_all(&self, anonymizers: &[Anonymizer]) -> Vec<Result<BenchmarkResult>> {
        anonymizers
            .iter()
            .map(|anonymizer| benchmark(anonymizer, self.config.iterations, &self.config.probe))
            .collect()
    }
}
