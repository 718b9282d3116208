use crate::usecases::ports::{CompileDiagnostic, RuntimeError};

#[derive(Debug, Clone)]
pub enum MockError {
    Init(String),
    Compile(String),
    Deploy(String),
    NoSuchFunction,
    Call(String),
}

impl MockError {
    /// `subject` is the artifact for deploy errors and the function for call errors.
    pub fn to_runtime_error(&self, subject: &str) -> RuntimeError {
        match self {
            MockError::Init(reason) => RuntimeError::Init(reason.clone()),
            MockError::Compile(message) => RuntimeError::Compile {
                artifact: subject.to_string(),
                diagnostics: vec![CompileDiagnostic::new(1, 1, message.clone())],
            },
            MockError::Deploy(reason) => RuntimeError::Deploy {
                artifact: subject.to_string(),
                reason: reason.clone(),
            },
            MockError::NoSuchFunction => RuntimeError::NoSuchFunction(subject.to_string()),
            MockError::Call(reason) => RuntimeError::Call {
                function: subject.to_string(),
                reason: reason.clone(),
            },
        }
    }
}
