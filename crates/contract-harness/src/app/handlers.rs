use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use harness_infra::usecases::{
    Harness, RunCaseUseCaseImpl, RunSuiteUseCase, RunSuiteUseCaseImpl, SuiteInput, TestCase,
};
use harness_infra::{HarnessConfig, InMemoryContractRuntime, SuiteManifest};
use tracing::debug;

use crate::adapters::presenter::Presenter;
use crate::app::error::CliError;
use crate::app::exit_codes;

pub type HandlerResult = Result<i32, CliError>;

pub struct HandlerContext<'a> {
    pub presenter: &'a dyn Presenter,
    pub suite: PathBuf,
}

impl<'a> HandlerContext<'a> {
    pub fn new(presenter: &'a dyn Presenter, suite: PathBuf) -> Self {
        Self { presenter, suite }
    }

    async fn load_cases(&self) -> Result<Vec<TestCase>, CliError> {
        let manifest = SuiteManifest::load(&self.suite).await?;
        Ok(manifest.into_cases())
    }
}

/// Wires the in-memory runtime into the suite runner.
pub fn build_suite_runner(
    config: &HarnessConfig,
) -> RunSuiteUseCaseImpl<RunCaseUseCaseImpl<InMemoryContractRuntime>> {
    let runtime = Arc::new(InMemoryContractRuntime::new(config.max_instances()));
    let harness = Arc::new(Harness::new(runtime).with_step_timeout(config.step_timeout()));
    let run_case =
        Arc::new(RunCaseUseCaseImpl::new(harness).with_case_timeout(config.case_timeout()));
    RunSuiteUseCaseImpl::new(run_case).with_max_parallel(config.max_parallel())
}

pub async fn handle_run_tests(
    ctx: &HandlerContext<'_>,
    filter: Option<String>,
    jobs: Option<u64>,
    timeout_ms: Option<u64>,
) -> HandlerResult {
    let cases = ctx.load_cases().await?;

    let mut config = HarnessConfig::from_env();
    if let Some(jobs) = jobs {
        config = config.with_max_parallel(usize::try_from(jobs).unwrap_or(usize::MAX));
    }
    if let Some(timeout_ms) = timeout_ms {
        config = config.with_case_timeout(Duration::from_millis(timeout_ms));
    }
    debug!(?config, cases = cases.len(), "Running suite");

    let runner = build_suite_runner(&config);
    let report = runner.execute(SuiteInput { cases, filter }).await;
    ctx.presenter.present_suite(&report);

    Ok(if report.all_passed() {
        exit_codes::SUCCESS
    } else {
        exit_codes::TESTS_FAILED
    })
}

pub async fn handle_list(ctx: &HandlerContext<'_>, filter: Option<String>) -> HandlerResult {
    let cases = ctx.load_cases().await?;
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|case| {
            filter
                .as_deref()
                .is_none_or(|filter| case.name.contains(filter))
        })
        .collect();
    ctx.presenter.present_case_list(&selected);
    Ok(exit_codes::SUCCESS)
}
