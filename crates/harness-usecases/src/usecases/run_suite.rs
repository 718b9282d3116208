use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::usecases::run_case::RunCaseUseCase;
use crate::usecases::test_case::{CaseReport, SuiteReport, TestCase};

pub const DEFAULT_MAX_PARALLEL: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct SuiteInput {
    pub cases: Vec<TestCase>,
    /// Only cases whose name contains this substring run.
    pub filter: Option<String>,
}

#[async_trait]
pub trait RunSuiteUseCase: Send + Sync {
    async fn execute(&self, input: SuiteInput) -> SuiteReport;
}

/// Runs cases concurrently, each in its own runtime instance, and reports
/// them in declaration order.
pub struct RunSuiteUseCaseImpl<U: RunCaseUseCase> {
    run_case: Arc<U>,
    max_parallel: usize,
}

impl<U: RunCaseUseCase> RunSuiteUseCaseImpl<U> {
    pub fn new(run_case: Arc<U>) -> Self {
        Self {
            run_case,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }
}

#[async_trait]
impl<U: RunCaseUseCase + 'static> RunSuiteUseCase for RunSuiteUseCaseImpl<U> {
    #[tracing::instrument(
        skip(self, input),
        fields(cases = input.cases.len(), filter = ?input.filter, max_parallel = self.max_parallel)
    )]
    async fn execute(&self, input: SuiteInput) -> SuiteReport {
        let started = Instant::now();
        let total = input.cases.len();
        let selected: Vec<TestCase> = match input.filter.as_deref() {
            Some(filter) => input
                .cases
                .into_iter()
                .filter(|case| case.name.contains(filter))
                .collect(),
            None => input.cases,
        };
        let skipped = total - selected.len();

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<CaseReport>> = vec![None; selected.len()];

        for (index, case) in selected.into_iter().enumerate() {
            let run_case = Arc::clone(&self.run_case);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // Never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                (index, run_case.execute(case).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    debug!(case = %report.name, passed = report.passed(), "Case finished");
                    slots[index] = Some(report);
                }
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => debug!(error = %err, "Case task cancelled"),
            }
        }

        let report = SuiteReport {
            cases: slots.into_iter().flatten().collect(),
            skipped,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped,
            elapsed_ms = report.elapsed_ms,
            "Suite finished"
        );
        report
    }
}
