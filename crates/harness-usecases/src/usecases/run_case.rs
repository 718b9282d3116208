use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::{Felt, Literal};
use crate::usecases::error::{HarnessError, Step};
use crate::usecases::harness::{Harness, assert_equals};
use crate::usecases::ports::ContractRuntime;
use crate::usecases::test_case::{CaseOutcome, CaseReport, Expectation, TestCase};

pub const DEFAULT_CASE_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait RunCaseUseCase: Send + Sync {
    async fn execute(&self, case: TestCase) -> CaseReport;
}

/// Runs one case in its own runtime instance: create, deploy, call, assert.
pub struct RunCaseUseCaseImpl<R: ContractRuntime> {
    harness: Arc<Harness<R>>,
    case_timeout: Duration,
}

impl<R: ContractRuntime> RunCaseUseCaseImpl<R> {
    pub fn new(harness: Arc<Harness<R>>) -> Self {
        Self {
            harness,
            case_timeout: DEFAULT_CASE_TIMEOUT,
        }
    }

    pub fn with_case_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = timeout;
        self
    }

    async fn run_steps(
        &self,
        case: &TestCase,
        actual: &mut Option<String>,
    ) -> Result<(), HarnessError> {
        let constructor_args =
            to_felts(&case.constructor_args).map_err(|reason| HarnessError::Deploy {
                artifact: case.artifact.to_string(),
                reason,
            })?;
        let args = to_felts(&case.args).map_err(|reason| HarnessError::Call {
            function: case.accessor.clone(),
            reason,
        })?;

        let runtime = self.harness.create_runtime().await?;
        let contract = self
            .harness
            .deploy_with_args(&runtime, &case.artifact, &constructor_args)
            .await?;

        let result = if args.is_empty() {
            self.harness
                .call_accessor(&contract, &case.accessor)
                .await?
        } else {
            self.harness.call(&contract, &case.accessor, &args).await?
        };

        match &case.expectation {
            Expectation::Values(expected) => {
                *actual = Some(result.render_like(expected));
                assert_equals(&result, expected)
            }
            Expectation::Error(_) => {
                *actual = Some(result.to_string());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<R: ContractRuntime + 'static> RunCaseUseCase for RunCaseUseCaseImpl<R> {
    #[tracing::instrument(
        skip(self, case),
        fields(case = %case.name, artifact = %case.artifact, accessor = %case.accessor)
    )]
    async fn execute(&self, case: TestCase) -> CaseReport {
        let started = Instant::now();
        let timeout = case.timeout.unwrap_or(self.case_timeout);
        let mut actual = None;

        let result = match tokio::time::timeout(timeout, self.run_steps(&case, &mut actual)).await
        {
            Ok(result) => result,
            Err(_) => Err(HarnessError::Timeout {
                step: Step::Case,
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        let outcome = judge(&case.expectation, result, actual.as_deref());
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            CaseOutcome::Passed => info!(elapsed_ms, "Case passed"),
            CaseOutcome::Failed(err) => {
                info!(elapsed_ms, kind = %err.kind(), error = %err, "Case failed")
            }
        }

        CaseReport {
            name: case.name,
            outcome,
            elapsed_ms,
            actual,
        }
    }
}

fn judge(
    expectation: &Expectation,
    result: Result<(), HarnessError>,
    actual: Option<&str>,
) -> CaseOutcome {
    match (expectation, result) {
        (Expectation::Values(_), Ok(())) => CaseOutcome::Passed,
        (Expectation::Values(_), Err(err)) => CaseOutcome::Failed(err),
        (Expectation::Error(kind), Err(err)) if err.kind() == *kind => {
            debug!(error = %err, "Expected error observed");
            CaseOutcome::Passed
        }
        (Expectation::Error(_), Err(err)) => CaseOutcome::Failed(err),
        (Expectation::Error(kind), Ok(())) => CaseOutcome::Failed(HarnessError::AssertionFailed {
            expected: format!("{} error", kind),
            actual: actual.unwrap_or("()").to_string(),
            detail: "every step succeeded".to_string(),
        }),
    }
}

fn to_felts(literals: &[Literal]) -> Result<Vec<Felt>, String> {
    literals
        .iter()
        .map(|literal| {
            literal
                .to_felt()
                .map_err(|err| format!("argument {} is not a valid felt: {}", literal, err))
        })
        .collect()
}
