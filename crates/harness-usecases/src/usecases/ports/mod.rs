//! Port interfaces owned by use cases.

pub mod contract_runtime;
pub mod errors;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use contract_runtime::{ContractRuntime, InvocationMode, RuntimeHandle, RuntimeInstance};
pub use errors::{CompileDiagnostic, RuntimeError};
