//! Failure taxonomy for harness steps.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::common::error_codes::{self, ErrorCategory};
use crate::usecases::ports::errors::summarize;
use crate::usecases::ports::{CompileDiagnostic, RuntimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CreateRuntime,
    Deploy,
    Call,
    Assert,
    Case,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::CreateRuntime => "create_runtime",
            Step::Deploy => "deploy",
            Step::Call => "call",
            Step::Assert => "assert",
            Step::Case => "case",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RuntimeInit,
    Compile,
    Deploy,
    NoSuchFunction,
    Call,
    AssertionFailed,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Invalid error kind '{0}'. Must be one of: runtime_init, compile, deploy, no_such_function, call, assertion_failed, timeout"
)]
pub struct ErrorKindParseError(pub String);

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::RuntimeInit,
        ErrorKind::Compile,
        ErrorKind::Deploy,
        ErrorKind::NoSuchFunction,
        ErrorKind::Call,
        ErrorKind::AssertionFailed,
        ErrorKind::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RuntimeInit => "runtime_init",
            ErrorKind::Compile => "compile",
            ErrorKind::Deploy => "deploy",
            ErrorKind::NoSuchFunction => "no_such_function",
            ErrorKind::Call => "call",
            ErrorKind::AssertionFailed => "assertion_failed",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = ErrorKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ErrorKindParseError(s.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarnessError {
    #[error("Runtime initialization failed: {0}")]
    RuntimeInit(String),
    #[error("Compile error in {artifact}: {}", summarize(.diagnostics))]
    Compile {
        artifact: String,
        diagnostics: Vec<CompileDiagnostic>,
    },
    #[error("Deploy error for {artifact}: {reason}")]
    Deploy { artifact: String, reason: String },
    #[error("No such function: {function}")]
    NoSuchFunction { function: String },
    #[error("Call to '{function}' failed: {reason}")]
    Call { function: String, reason: String },
    #[error("Assertion failed: expected {expected}, got {actual} ({detail})")]
    AssertionFailed {
        expected: String,
        actual: String,
        detail: String,
    },
    #[error("Step '{step}' timed out after {timeout_ms}ms")]
    Timeout { step: Step, timeout_ms: u64 },
}

impl HarnessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::RuntimeInit(_) => ErrorKind::RuntimeInit,
            HarnessError::Compile { .. } => ErrorKind::Compile,
            HarnessError::Deploy { .. } => ErrorKind::Deploy,
            HarnessError::NoSuchFunction { .. } => ErrorKind::NoSuchFunction,
            HarnessError::Call { .. } => ErrorKind::Call,
            HarnessError::AssertionFailed { .. } => ErrorKind::AssertionFailed,
            HarnessError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn code(&self) -> i32 {
        match self.kind() {
            ErrorKind::RuntimeInit => error_codes::RUNTIME_INIT_FAILED,
            ErrorKind::Compile => error_codes::COMPILE_FAILED,
            ErrorKind::Deploy => error_codes::DEPLOY_FAILED,
            ErrorKind::NoSuchFunction => error_codes::NO_SUCH_FUNCTION,
            ErrorKind::Call => error_codes::CALL_FAILED,
            ErrorKind::AssertionFailed => error_codes::ASSERTION_FAILED,
            ErrorKind::Timeout => error_codes::STEP_TIMEOUT,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        error_codes::category_for_code(self.code())
    }

    pub fn suggestion(&self) -> String {
        match self {
            HarnessError::RuntimeInit(_) => {
                "The runtime could not start an instance. Lower suite parallelism or raise CONTRACT_HARNESS_MAX_INSTANCES."
                    .to_string()
            }
            HarnessError::Compile { artifact, .. } => {
                format!("Fix the reported diagnostics in {} and re-run.", artifact)
            }
            HarnessError::Deploy { .. } => {
                "Check the constructor arguments and any assertions in the constructor.".to_string()
            }
            HarnessError::NoSuchFunction { function } => format!(
                "Declare '{}' as @view (or @external) in the contract, or fix the accessor name.",
                function
            ),
            HarnessError::Call { .. } => {
                "Check the function's arity and decorators, and any assertions it performs."
                    .to_string()
            }
            HarnessError::AssertionFailed { .. } => {
                "The contract returned a different value. Update the expectation or the contract."
                    .to_string()
            }
            HarnessError::Timeout { .. } => {
                "Raise the timeout with --timeout-ms or CONTRACT_HARNESS_CASE_TIMEOUT_MS.".to_string()
            }
        }
    }
}

impl From<RuntimeError> for HarnessError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Init(reason) => HarnessError::RuntimeInit(reason),
            RuntimeError::Compile {
                artifact,
                diagnostics,
            } => HarnessError::Compile {
                artifact,
                diagnostics,
            },
            RuntimeError::Deploy { artifact, reason } => HarnessError::Deploy { artifact, reason },
            RuntimeError::NoSuchFunction(function) => HarnessError::NoSuchFunction { function },
            RuntimeError::Call { function, reason } => HarnessError::Call { function, reason },
            RuntimeError::UnknownContract(address) => HarnessError::Call {
                function: "<unknown>".to_string(),
                reason: format!("contract {} is not deployed in this runtime", address),
            },
        }
    }
}
