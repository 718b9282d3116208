mod error;
mod harness;
mod run_case;
mod run_suite;
mod test_case;

pub use error::{ErrorKind, ErrorKindParseError, HarnessError, Step};
pub use harness::{DEFAULT_STEP_TIMEOUT, DeployedContract, Harness, assert_equals};
pub use run_case::{DEFAULT_CASE_TIMEOUT, RunCaseUseCase, RunCaseUseCaseImpl};
pub use run_suite::{DEFAULT_MAX_PARALLEL, RunSuiteUseCase, RunSuiteUseCaseImpl, SuiteInput};
pub use test_case::{CaseOutcome, CaseReport, Expectation, SuiteReport, SuiteSummary, TestCase};
pub mod ports;
