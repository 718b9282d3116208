//! The four harness operations: create a runtime, deploy, call, assert.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::{
    ArtifactPath, CallResult, ContractAddress, Felt, Literal, Mismatch, RuntimeId,
    render_literals,
};
use crate::usecases::error::{HarnessError, Step};
use crate::usecases::ports::{ContractRuntime, InvocationMode, RuntimeError, RuntimeHandle};

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// A contract deployed into one runtime instance. Holding it keeps that
/// instance alive.
#[derive(Clone)]
pub struct DeployedContract {
    runtime: RuntimeHandle,
    address: ContractAddress,
    artifact: ArtifactPath,
}

impl DeployedContract {
    pub fn address(&self) -> &ContractAddress {
        &self.address
    }

    pub fn runtime_id(&self) -> RuntimeId {
        self.runtime.id()
    }
}

impl fmt::Debug for DeployedContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployedContract")
            .field("runtime", &self.runtime.id())
            .field("address", &self.address)
            .field("artifact", &self.artifact)
            .finish()
    }
}

pub struct Harness<R: ContractRuntime> {
    runtime: Arc<R>,
    step_timeout: Duration,
}

impl<R: ContractRuntime> Harness<R> {
    pub fn new(runtime: Arc<R>) -> Self {
        Self {
            runtime,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    #[tracing::instrument(skip(self), fields(runtime = self.runtime.name()))]
    pub async fn create_runtime(&self) -> Result<RuntimeHandle, HarnessError> {
        let handle = self
            .bounded(Step::CreateRuntime, self.runtime.create_runtime())
            .await?;
        debug!(instance = %handle.id(), "Runtime instance created");
        Ok(handle)
    }

    pub async fn deploy(
        &self,
        runtime: &RuntimeHandle,
        artifact: &ArtifactPath,
    ) -> Result<DeployedContract, HarnessError> {
        self.deploy_with_args(runtime, artifact, &[]).await
    }

    #[tracing::instrument(
        skip(self, runtime, constructor_args),
        fields(instance = %runtime.id(), artifact = %artifact, args = constructor_args.len())
    )]
    pub async fn deploy_with_args(
        &self,
        runtime: &RuntimeHandle,
        artifact: &ArtifactPath,
        constructor_args: &[Felt],
    ) -> Result<DeployedContract, HarnessError> {
        let address = self
            .bounded(Step::Deploy, runtime.deploy(artifact, constructor_args))
            .await?;
        debug!(address = %address, "Contract deployed");
        Ok(DeployedContract {
            runtime: Arc::clone(runtime),
            address,
            artifact: artifact.clone(),
        })
    }

    /// Calls a zero-argument view function.
    pub async fn call_accessor(
        &self,
        contract: &DeployedContract,
        accessor: &str,
    ) -> Result<CallResult, HarnessError> {
        self.dispatch(contract, accessor, &[], InvocationMode::Accessor)
            .await
    }

    /// Read-only call with calldata; storage writes are discarded.
    pub async fn call(
        &self,
        contract: &DeployedContract,
        function: &str,
        args: &[Felt],
    ) -> Result<CallResult, HarnessError> {
        self.dispatch(contract, function, args, InvocationMode::Call)
            .await
    }

    /// State-changing call; storage writes persist in the contract's instance.
    pub async fn invoke(
        &self,
        contract: &DeployedContract,
        function: &str,
        args: &[Felt],
    ) -> Result<CallResult, HarnessError> {
        self.dispatch(contract, function, args, InvocationMode::Invoke)
            .await
    }

    #[tracing::instrument(
        skip(self, contract, args),
        fields(instance = %contract.runtime_id(), address = %contract.address, args = args.len())
    )]
    async fn dispatch(
        &self,
        contract: &DeployedContract,
        function: &str,
        args: &[Felt],
        mode: InvocationMode,
    ) -> Result<CallResult, HarnessError> {
        let outcome = tokio::time::timeout(
            self.step_timeout,
            contract
                .runtime
                .invoke(&contract.address, function, args, mode),
        )
        .await;

        let values = match outcome {
            Ok(Ok(values)) => values,
            Ok(Err(RuntimeError::UnknownContract(address))) => {
                return Err(HarnessError::Call {
                    function: function.to_string(),
                    reason: format!("contract {} is not deployed in this runtime", address),
                });
            }
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(self.timeout_error(Step::Call)),
        };

        let result = CallResult::new(values);
        debug!(result = %result, ?mode, "Call returned");
        Ok(result)
    }

    async fn bounded<T>(
        &self,
        step: Step,
        operation: impl Future<Output = Result<T, RuntimeError>>,
    ) -> Result<T, HarnessError> {
        match tokio::time::timeout(self.step_timeout, operation).await {
            Ok(result) => result.map_err(HarnessError::from),
            Err(_) => Err(self.timeout_error(step)),
        }
    }

    fn timeout_error(&self, step: Step) -> HarnessError {
        HarnessError::Timeout {
            step,
            timeout_ms: self.step_timeout.as_millis() as u64,
        }
    }
}

/// Element-wise, order-sensitive comparison of a call result with expected
/// literals.
pub fn assert_equals(actual: &CallResult, expected: &[Literal]) -> Result<(), HarnessError> {
    let expected_felts = expected
        .iter()
        .map(|literal| {
            literal
                .to_felt()
                .map_err(|err| HarnessError::AssertionFailed {
                    expected: render_literals(expected),
                    actual: actual.render_like(expected),
                    detail: format!("expected literal {} is not a valid felt: {}", literal, err),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(mismatch) = actual.first_mismatch(&expected_felts) else {
        return Ok(());
    };

    let detail = match mismatch {
        Mismatch::Length { expected, actual } => {
            format!("expected {} value(s), got {}", expected, actual)
        }
        Mismatch::Element { index } => format!("value {} differs", index),
    };
    Err(HarnessError::AssertionFailed {
        expected: render_literals(expected),
        actual: actual.render_like(expected),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encode_short_string;
    use crate::test_support::{MockContractRuntime, MockError};
    use crate::usecases::error::ErrorKind;

    const GREETING: &str = "God bless Ezen-wata";

    fn greeting_runtime() -> Arc<MockContractRuntime> {
        Arc::new(
            MockContractRuntime::builder()
                .with_function("get_greeting", vec![encode_short_string(GREETING).unwrap()])
                .build(),
        )
    }

    #[tokio::test]
    async fn test_deploy_then_call_accessor_returns_values() {
        let harness = Harness::new(greeting_runtime());
        let runtime = harness.create_runtime().await.unwrap();
        let contract = harness
            .deploy(&runtime, &ArtifactPath::from("main.cairo"))
            .await
            .unwrap();

        let result = harness
            .call_accessor(&contract, "get_greeting")
            .await
            .unwrap();

        assert_eq!(result.to_string(), "('God bless Ezen-wata',)");
        assert_eq!(contract.runtime_id(), runtime.id());
    }

    #[tokio::test]
    async fn test_call_accessor_unknown_function_is_no_such_function() {
        let harness = Harness::new(greeting_runtime());
        let runtime = harness.create_runtime().await.unwrap();
        let contract = harness
            .deploy(&runtime, &ArtifactPath::from("main.cairo"))
            .await
            .unwrap();

        let err = harness
            .call_accessor(&contract, "get_unknown")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoSuchFunction);
    }

    #[tokio::test]
    async fn test_create_runtime_surfaces_init_error() {
        let mock = Arc::new(
            MockContractRuntime::builder()
                .with_init_error(MockError::Init("no toolchain".to_string()))
                .build(),
        );
        let harness = Harness::new(Arc::clone(&mock));

        let err = harness.create_runtime().await.unwrap_err();

        assert!(matches!(err, HarnessError::RuntimeInit(ref reason) if reason == "no toolchain"));
        assert_eq!(mock.create_call_count(), 1);
    }

    #[tokio::test]
    async fn test_deploy_surfaces_compile_error_without_calling() {
        let mock = Arc::new(
            MockContractRuntime::builder()
                .with_function("get_greeting", vec![Felt::from(1u64)])
                .with_deploy_error(MockError::Compile("unexpected token".to_string()))
                .build(),
        );
        let harness = Harness::new(Arc::clone(&mock));
        let runtime = harness.create_runtime().await.unwrap();

        let err = harness
            .deploy(&runtime, &ArtifactPath::from("broken.cairo"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Compile);
        assert_eq!(mock.invoke_call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_deploy_times_out() {
        let mock = Arc::new(
            MockContractRuntime::builder()
                .with_deploy_delay(Duration::from_secs(60))
                .build(),
        );
        let harness = Harness::new(mock).with_step_timeout(Duration::from_millis(100));
        let runtime = harness.create_runtime().await.unwrap();

        let err = harness
            .deploy(&runtime, &ArtifactPath::from("main.cairo"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            HarnessError::Timeout {
                step: Step::Deploy,
                timeout_ms: 100
            }
        );
    }

    #[tokio::test]
    async fn test_call_with_args_forwards_calldata() {
        let mock = Arc::new(
            MockContractRuntime::builder()
                .with_function("echo", vec![Felt::from(5u64)])
                .build(),
        );
        let harness = Harness::new(Arc::clone(&mock));
        let runtime = harness.create_runtime().await.unwrap();
        let contract = harness
            .deploy(&runtime, &ArtifactPath::from("main.cairo"))
            .await
            .unwrap();

        harness
            .call(&contract, "echo", &[Felt::from(5u64)])
            .await
            .unwrap();

        let calls = mock.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec![Felt::from(5u64)]);
        assert_eq!(calls[0].mode, InvocationMode::Call);
    }

    #[test]
    fn test_assert_equals_passes_on_identical_values() {
        let actual = CallResult::new(vec![encode_short_string(GREETING).unwrap()]);
        assert!(assert_equals(&actual, &[Literal::from(GREETING)]).is_ok());
    }

    #[test]
    fn test_assert_equals_reports_length_mismatch() {
        let actual = CallResult::new(vec![Felt::from(1u64)]);
        let err = assert_equals(&actual, &[Literal::from(1u64), Literal::from(2u64)]).unwrap_err();

        match err {
            HarnessError::AssertionFailed {
                expected,
                actual,
                detail,
            } => {
                assert_eq!(expected, "(1, 2)");
                assert_eq!(actual, "(1,)");
                assert_eq!(detail, "expected 2 value(s), got 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_assert_equals_reports_element_mismatch_as_text() {
        let actual = CallResult::new(vec![encode_short_string("gm").unwrap()]);
        let err = assert_equals(&actual, &[Literal::from(GREETING)]).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Assertion failed: expected ('God bless Ezen-wata',), got ('gm',) (value 0 differs)"
        );
    }

    #[test]
    fn test_assert_equals_rejects_unencodable_expectation() {
        let actual = CallResult::new(vec![Felt::from(1u64)]);
        let too_long = "x".repeat(32);
        let err = assert_equals(&actual, &[Literal::short_string(too_long)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailed);
    }
}
