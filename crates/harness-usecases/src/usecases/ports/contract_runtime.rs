//! Port for the contract runtime the harness drives.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::errors::RuntimeError;
use crate::domain::{ArtifactPath, ContractAddress, Felt, RuntimeId};

/// Shared handle to one isolated runtime instance. The instance is torn down
/// when the last handle (including those held by deployed contracts) drops.
pub type RuntimeHandle = Arc<dyn RuntimeInstance>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Read-only call of a zero-argument view function.
    Accessor,
    /// Read-only call of any entry point; writes are discarded.
    Call,
    /// State-changing call; writes are committed to the instance.
    Invoke,
}

impl InvocationMode {
    pub fn commits(&self) -> bool {
        matches!(self, InvocationMode::Invoke)
    }
}

/// Factory for fresh runtime instances.
#[async_trait]
pub trait ContractRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_runtime(&self) -> Result<RuntimeHandle, RuntimeError>;
}

#[async_trait]
pub trait RuntimeInstance: Send + Sync {
    fn id(&self) -> RuntimeId;

    /// Compiles the artifact if needed and deploys it, running its constructor
    /// with `constructor_args`.
    async fn deploy(
        &self,
        artifact: &ArtifactPath,
        constructor_args: &[Felt],
    ) -> Result<ContractAddress, RuntimeError>;

    async fn invoke(
        &self,
        contract: &ContractAddress,
        function: &str,
        args: &[Felt],
        mode: InvocationMode,
    ) -> Result<Vec<Felt>, RuntimeError>;
}

impl fmt::Debug for dyn RuntimeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeInstance")
            .field("id", &self.id())
            .finish()
    }
}
