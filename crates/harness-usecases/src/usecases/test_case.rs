//! Test case definitions and their reports.

use std::time::Duration;

use serde::Serialize;

use crate::domain::{ArtifactPath, Literal};
use crate::usecases::error::{ErrorKind, HarnessError};

#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// The accessor returns exactly these values, in order.
    Values(Vec<Literal>),
    /// Some step fails with this kind of error.
    Error(ErrorKind),
}

/// Deploy `artifact` into a fresh runtime, call `accessor`, check the result.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub artifact: ArtifactPath,
    pub accessor: String,
    pub args: Vec<Literal>,
    pub constructor_args: Vec<Literal>,
    pub expectation: Expectation,
    pub timeout: Option<Duration>,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        artifact: impl Into<ArtifactPath>,
        accessor: impl Into<String>,
        expected: Vec<Literal>,
    ) -> Self {
        Self {
            name: name.into(),
            artifact: artifact.into(),
            accessor: accessor.into(),
            args: Vec::new(),
            constructor_args: Vec::new(),
            expectation: Expectation::Values(expected),
            timeout: None,
        }
    }

    pub fn with_args(mut self, args: Vec<Literal>) -> Self {
        self.args = args;
        self
    }

    pub fn with_constructor_args(mut self, args: Vec<Literal>) -> Self {
        self.constructor_args = args;
        self
    }

    pub fn expecting_error(mut self, kind: ErrorKind) -> Self {
        self.expectation = Expectation::Error(kind);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Passed,
    Failed(HarnessError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    pub name: String,
    pub outcome: CaseOutcome,
    pub elapsed_ms: u64,
    /// Rendered call result, when the call step was reached.
    pub actual: Option<String>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed)
    }

    pub fn error(&self) -> Option<&HarnessError> {
        match &self.outcome {
            CaseOutcome::Passed => None,
            CaseOutcome::Failed(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    /// Cases excluded by the name filter.
    pub skipped: usize,
    pub elapsed_ms: u64,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|case| case.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            total: self.cases.len(),
            passed: self.passed(),
            failed: self.failed(),
            skipped: self.skipped,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
}
