//! Test-only mocks for use case ports.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod mock_error;
mod mock_runtime;

pub use mock_error::MockError;
pub use mock_runtime::{Invocation, MockContractRuntime};
