use std::fmt;

use thiserror::Error;

/// One compiler message, positioned in the artifact source (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl CompileDiagnostic {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Diagnostic without a source position, e.g. an unreadable file.
    pub fn unpositioned(message: impl Into<String>) -> Self {
        Self::new(0, 0, message)
    }
}

impl fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}:{}: {}", self.line, self.column, self.message)
        }
    }
}

pub(crate) fn summarize(diagnostics: &[CompileDiagnostic]) -> String {
    match diagnostics {
        [] => "unknown error".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Failed to initialize runtime: {0}")]
    Init(String),
    #[error("Failed to compile {artifact}: {}", summarize(.diagnostics))]
    Compile {
        artifact: String,
        diagnostics: Vec<CompileDiagnostic>,
    },
    #[error("Deployment of {artifact} rejected: {reason}")]
    Deploy { artifact: String, reason: String },
    #[error("Contract {0} is not deployed in this runtime")]
    UnknownContract(String),
    #[error("Function '{0}' not found")]
    NoSuchFunction(String),
    #[error("Call to '{function}' failed: {reason}")]
    Call { function: String, reason: String },
}

impl RuntimeError {
    pub fn operation(&self) -> &'static str {
        match self {
            RuntimeError::Init(_) => "create_runtime",
            RuntimeError::Compile { .. } | RuntimeError::Deploy { .. } => "deploy",
            RuntimeError::UnknownContract(_)
            | RuntimeError::NoSuchFunction(_)
            | RuntimeError::Call { .. } => "invoke",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_message_shows_first_diagnostic() {
        let err = RuntimeError::Compile {
            artifact: "main.cairo".to_string(),
            diagnostics: vec![
                CompileDiagnostic::new(3, 5, "unexpected token ')'"),
                CompileDiagnostic::new(9, 1, "expected 'end'"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Failed to compile main.cairo: 3:5: unexpected token ')' (and 1 more)"
        );
    }

    #[test]
    fn test_unpositioned_diagnostic_omits_location() {
        let diagnostic = CompileDiagnostic::unpositioned("file not found");
        assert_eq!(diagnostic.to_string(), "file not found");
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(RuntimeError::Init("x".into()).operation(), "create_runtime");
        assert_eq!(
            RuntimeError::NoSuchFunction("get".into()).operation(),
            "invoke"
        );
    }
}
