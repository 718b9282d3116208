//! In-process contract runtime backed by the Cairo subset interpreter.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{ArtifactPath, ContractAddress, Felt, RuntimeId};
use crate::infra::cairo::{
    CompiledContract, DEFAULT_STEP_LIMIT, FunctionKind, Storage, Vm, compile_source,
};
use crate::usecases::ports::{
    CompileDiagnostic, ContractRuntime, InvocationMode, RuntimeError, RuntimeHandle,
    RuntimeInstance,
};

pub const DEFAULT_MAX_INSTANCES: usize = 64;
const FIRST_ADDRESS: u64 = 0x1000;

/// Creates isolated in-memory instances, at most `max_instances` alive at once.
///
/// Compilation and execution run on the blocking pool, so a caller's timeout
/// can give up on them. Every entry-point run is also capped at `step_limit`
/// interpreter steps, which bounds how long the abandoned work keeps going.
pub struct InMemoryContractRuntime {
    max_instances: usize,
    step_limit: u64,
    live: Arc<AtomicUsize>,
}

impl Default for InMemoryContractRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INSTANCES)
    }
}

impl InMemoryContractRuntime {
    pub fn new(max_instances: usize) -> Self {
        Self {
            max_instances,
            step_limit: DEFAULT_STEP_LIMIT,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn reserve_slot(&self) -> Option<InstanceSlot> {
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (live < self.max_instances).then_some(live + 1)
            })
            .ok()
            .map(|_| InstanceSlot(Arc::clone(&self.live)))
    }
}

#[async_trait]
impl ContractRuntime for InMemoryContractRuntime {
    fn name(&self) -> &'static str {
        "cairo-in-memory"
    }

    async fn create_runtime(&self) -> Result<RuntimeHandle, RuntimeError> {
        let Some(slot) = self.reserve_slot() else {
            warn!(max = self.max_instances, "Runtime instance limit reached");
            return Err(RuntimeError::Init(format!(
                "instance limit of {} reached",
                self.max_instances
            )));
        };

        Ok(Arc::new(InMemoryInstance {
            id: RuntimeId::new(),
            step_limit: self.step_limit,
            _slot: slot,
            state: Mutex::new(InstanceState::default()),
        }))
    }
}

/// Counts toward the live instance total until dropped.
struct InstanceSlot(Arc<AtomicUsize>);

impl Drop for InstanceSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Deployment {
    contract: Arc<CompiledContract>,
    storage: Storage,
}

#[derive(Default)]
struct InstanceState {
    deployments: HashMap<ContractAddress, Deployment>,
    deployed: u64,
}

struct InMemoryInstance {
    id: RuntimeId,
    step_limit: u64,
    _slot: InstanceSlot,
    state: Mutex<InstanceState>,
}

impl InMemoryInstance {
    fn compile_error(artifact: &ArtifactPath, diagnostics: Vec<CompileDiagnostic>) -> RuntimeError {
        RuntimeError::Compile {
            artifact: artifact.to_string(),
            diagnostics,
        }
    }
}

#[async_trait]
impl RuntimeInstance for InMemoryInstance {
    fn id(&self) -> RuntimeId {
        self.id
    }

    #[tracing::instrument(skip(self, constructor_args), fields(instance = %self.id.short()))]
    async fn deploy(
        &self,
        artifact: &ArtifactPath,
        constructor_args: &[Felt],
    ) -> Result<ContractAddress, RuntimeError> {
        let source = tokio::fs::read_to_string(artifact.as_path())
            .await
            .map_err(|err| {
                Self::compile_error(
                    artifact,
                    vec![CompileDiagnostic::unpositioned(format!(
                        "cannot read artifact: {}",
                        err
                    ))],
                )
            })?;

        let step_limit = self.step_limit;
        let label = artifact.to_string();
        let args = constructor_args.to_vec();
        let (contract, storage) = tokio::task::spawn_blocking(move || -> Result<(CompiledContract, Storage), RuntimeError> {
            let contract = compile_source(&source)
                .map_err(|diagnostics| RuntimeError::Compile {
                    artifact: label.clone(),
                    diagnostics,
                })?;
            let mut storage = Storage::default();
            match contract.constructor() {
                Some(constructor) => {
                    Vm::new(&contract, &mut storage)
                        .with_step_limit(step_limit)
                        .run(constructor, &args)
                        .map_err(|err| RuntimeError::Deploy {
                            artifact: label.clone(),
                            reason: format!("constructor failed: {}", err),
                        })?;
                }
                None if !args.is_empty() => {
                    return Err(RuntimeError::Deploy {
                        artifact: label,
                        reason: format!(
                            "contract has no constructor but {} argument(s) were given",
                            args.len()
                        ),
                    });
                }
                None => {}
            }
            Ok((contract, storage))
        })
        .await
        .map_err(|err| RuntimeError::Deploy {
            artifact: artifact.to_string(),
            reason: format!("deploy task failed: {}", err),
        })??;

        let mut state = self.state.lock().await;
        let address = ContractAddress::new(Felt::from(FIRST_ADDRESS + state.deployed));
        state.deployed += 1;
        state.deployments.insert(
            address.clone(),
            Deployment {
                contract: Arc::new(contract),
                storage,
            },
        );
        debug!(address = %address, "Contract deployed");
        Ok(address)
    }

    #[tracing::instrument(skip(self, args), fields(instance = %self.id.short(), args = args.len()))]
    async fn invoke(
        &self,
        contract: &ContractAddress,
        function: &str,
        args: &[Felt],
        mode: InvocationMode,
    ) -> Result<Vec<Felt>, RuntimeError> {
        // Held across execution so invocations on one instance stay ordered.
        let mut state = self.state.lock().await;
        let deployment = state
            .deployments
            .get_mut(contract)
            .ok_or_else(|| RuntimeError::UnknownContract(contract.to_string()))?;
        let code = Arc::clone(&deployment.contract);

        let definition = code
            .function(function)
            .filter(|definition| definition.kind.is_entry_point())
            .ok_or_else(|| RuntimeError::NoSuchFunction(function.to_string()))?;

        if mode == InvocationMode::Accessor {
            let reason = if definition.kind != FunctionKind::View {
                Some(format!("'{}' is not a @view function", function))
            } else if !definition.params.is_empty() {
                Some(format!(
                    "an accessor takes no arguments, but '{}' declares {}",
                    function,
                    definition.params.len()
                ))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(RuntimeError::Call {
                    function: function.to_string(),
                    reason,
                });
            }
        }

        let step_limit = self.step_limit;
        let name = function.to_string();
        let args = args.to_vec();
        let mut scratch = deployment.storage.clone();
        let (values, scratch) = tokio::task::spawn_blocking(move || {
            let values = match code.function(&name) {
                Some(definition) => Vm::new(&code, &mut scratch)
                    .with_step_limit(step_limit)
                    .run(definition, &args)
                    .map_err(|err| err.to_string()),
                None => Err(format!("unknown function '{}'", name)),
            };
            values.map(|values| (values, scratch))
        })
        .await
        .map_err(|err| format!("execution task failed: {}", err))
        .and_then(|outcome| outcome)
        .map_err(|reason| RuntimeError::Call {
            function: function.to_string(),
            reason,
        })?;

        if mode.commits() {
            deployment.storage = scratch;
        }
        debug!(values = values.len(), ?mode, "Invocation finished");
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::domain::{decode_short_string, encode_short_string};
    use crate::usecases::{ErrorKind, Harness};

    const COUNTER: &str = include_str!("../../../../contracts/src/counter.cairo");
    const GREETING: &str = include_str!("../../../../contracts/src/main.cairo");

    fn write(dir: &Path, name: &str, source: &str) -> ArtifactPath {
        let path = dir.join(name);
        std::fs::write(&path, source).unwrap();
        ArtifactPath::new(path)
    }

    // Each `f{i}` calls `f{i-1}` twice, so `get_boom` makes 2^levels calls
    // without ever nesting deeper than `levels`.
    fn call_tree_source(levels: usize) -> String {
        let mut src = String::from("func f0(n: felt) -> (r: felt):\n    return (n + 1)\nend\n");
        for level in 1..=levels {
            src.push_str(&format!(
                "func f{level}(n: felt) -> (r: felt):\n    \
                 let (a) = f{below}(n)\n    \
                 let (b) = f{below}(n)\n    \
                 return (a + b)\nend\n",
                below = level - 1
            ));
        }
        src.push_str(&format!(
            "@view\nfunc get_boom() -> (r: felt):\n    return f{levels}(0)\nend\n"
        ));
        src
    }

    #[tokio::test]
    async fn test_greeting_accessor_returns_short_string() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "main.cairo", GREETING);
        let runtime = InMemoryContractRuntime::default();

        let instance = runtime.create_runtime().await.unwrap();
        let address = instance.deploy(&artifact, &[]).await.unwrap();
        let values = instance
            .invoke(&address, "get_greeting", &[], InvocationMode::Accessor)
            .await
            .unwrap();

        assert_eq!(values, vec![encode_short_string("God bless Ezen-wata").unwrap()]);
        assert_eq!(
            decode_short_string(&values[0]).as_deref(),
            Some("God bless Ezen-wata")
        );
    }

    #[tokio::test]
    async fn test_unknown_and_internal_functions_are_not_entry_points() {
        let dir = TempDir::new().unwrap();
        let artifact = write(
            dir.path(),
            "c.cairo",
            "func helper() -> (r: felt):\n return (1)\nend\n",
        );
        let runtime = InMemoryContractRuntime::default();
        let instance = runtime.create_runtime().await.unwrap();
        let address = instance.deploy(&artifact, &[]).await.unwrap();

        for name in ["get_unknown", "helper"] {
            let err = instance
                .invoke(&address, name, &[], InvocationMode::Accessor)
                .await
                .unwrap_err();
            assert_eq!(err, RuntimeError::NoSuchFunction(name.to_string()));
        }
    }

    #[tokio::test]
    async fn test_syntax_error_fails_deploy_with_diagnostics() {
        let dir = TempDir::new().unwrap();
        let artifact = write(
            dir.path(),
            "broken.cairo",
            include_str!("../../../../contracts/tests/syntax_error.cairo"),
        );
        let runtime = InMemoryContractRuntime::default();
        let instance = runtime.create_runtime().await.unwrap();

        let err = instance.deploy(&artifact, &[]).await.unwrap_err();

        match err {
            RuntimeError::Compile { diagnostics, .. } => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!((diagnostics[0].line, diagnostics[0].column), (5, 5));
                assert_eq!(diagnostics[0].message, "expected ':', found 'return'");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_is_compile_error() {
        let runtime = InMemoryContractRuntime::default();
        let instance = runtime.create_runtime().await.unwrap();

        let err = instance
            .deploy(&ArtifactPath::from("/nonexistent/main.cairo"), &[])
            .await
            .unwrap_err();

        match err {
            RuntimeError::Compile { diagnostics, .. } => {
                assert_eq!(diagnostics[0].line, 0);
                assert!(diagnostics[0].message.starts_with("cannot read artifact"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_call_discards_writes_and_invoke_commits() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "counter.cairo", COUNTER);
        let runtime = InMemoryContractRuntime::default();
        let instance = runtime.create_runtime().await.unwrap();
        let address = instance
            .deploy(&artifact, &[Felt::from(10u64)])
            .await
            .unwrap();
        let read = |instance: RuntimeHandle, address: ContractAddress| async move {
            instance
                .invoke(&address, "get_counter", &[], InvocationMode::Accessor)
                .await
                .unwrap()
        };

        let simulated = instance
            .invoke(&address, "increment", &[Felt::from(5u64)], InvocationMode::Call)
            .await
            .unwrap();
        assert_eq!(simulated, vec![Felt::from(15u64)]);
        assert_eq!(read(instance.clone(), address.clone()).await, vec![Felt::from(10u64)]);

        instance
            .invoke(&address, "increment", &[Felt::from(5u64)], InvocationMode::Invoke)
            .await
            .unwrap();
        assert_eq!(read(instance.clone(), address.clone()).await, vec![Felt::from(15u64)]);
    }

    #[tokio::test]
    async fn test_instances_are_isolated() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "counter.cairo", COUNTER);
        let runtime = InMemoryContractRuntime::default();

        let first = runtime.create_runtime().await.unwrap();
        let second = runtime.create_runtime().await.unwrap();
        let a = first.deploy(&artifact, &[Felt::zero()]).await.unwrap();
        let b = second.deploy(&artifact, &[Felt::zero()]).await.unwrap();
        first
            .invoke(&a, "increment", &[Felt::from(3u64)], InvocationMode::Invoke)
            .await
            .unwrap();

        let untouched = second
            .invoke(&b, "get_counter", &[], InvocationMode::Accessor)
            .await
            .unwrap();
        assert_eq!(untouched, vec![Felt::zero()]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_accessor_requires_view() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "counter.cairo", COUNTER);
        let runtime = InMemoryContractRuntime::default();
        let instance = runtime.create_runtime().await.unwrap();
        let address = instance.deploy(&artifact, &[Felt::zero()]).await.unwrap();

        let err = instance
            .invoke(&address, "increment", &[], InvocationMode::Accessor)
            .await
            .unwrap_err();

        assert!(matches!(err, RuntimeError::Call { ref reason, .. } if reason.contains("@view")));
    }

    #[tokio::test]
    async fn test_constructor_arity_mismatch_is_deploy_error() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "counter.cairo", COUNTER);
        let runtime = InMemoryContractRuntime::default();
        let instance = runtime.create_runtime().await.unwrap();

        let err = instance.deploy(&artifact, &[]).await.unwrap_err();

        assert!(matches!(err, RuntimeError::Deploy { .. }));
    }

    #[tokio::test]
    async fn test_instance_limit_and_release() {
        let runtime = InMemoryContractRuntime::new(1);

        let first = runtime.create_runtime().await.unwrap();
        let err = match runtime.create_runtime().await {
            Ok(_) => panic!("second instance should be refused"),
            Err(err) => err,
        };
        assert!(matches!(err, RuntimeError::Init(_)));

        drop(first);
        assert_eq!(runtime.live_instances(), 0);
        assert!(runtime.create_runtime().await.is_ok());
    }

    #[tokio::test]
    async fn test_contract_from_other_instance_is_unknown() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "main.cairo", GREETING);
        let runtime = InMemoryContractRuntime::default();
        let first = runtime.create_runtime().await.unwrap();
        let second = runtime.create_runtime().await.unwrap();
        let address = first.deploy(&artifact, &[]).await.unwrap();
        drop(first);

        let err = second
            .invoke(&address, "get_greeting", &[], InvocationMode::Accessor)
            .await
            .unwrap_err();

        assert!(matches!(err, RuntimeError::UnknownContract(_)));
    }

    #[tokio::test]
    async fn test_exponential_call_tree_ends_within_step_timeout() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "boom.cairo", &call_tree_source(40));
        let harness = Harness::new(Arc::new(InMemoryContractRuntime::default()))
            .with_step_timeout(Duration::from_millis(200));
        let runtime = harness.create_runtime().await.unwrap();
        let contract = harness.deploy(&runtime, &artifact).await.unwrap();

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            harness.call_accessor(&contract, "get_boom"),
        )
        .await
        .expect("accessor call should give up instead of hanging")
        .unwrap_err();

        assert!(
            matches!(err.kind(), ErrorKind::Timeout | ErrorKind::Call),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_step_limit_turns_runaway_call_into_call_error() {
        let dir = TempDir::new().unwrap();
        let artifact = write(dir.path(), "boom.cairo", &call_tree_source(40));
        let runtime = InMemoryContractRuntime::default().with_step_limit(1_000);
        let instance = runtime.create_runtime().await.unwrap();
        let address = instance.deploy(&artifact, &[]).await.unwrap();

        let err = instance
            .invoke(&address, "get_boom", &[], InvocationMode::Accessor)
            .await
            .unwrap_err();

        assert!(
            matches!(err, RuntimeError::Call { ref reason, .. } if reason.contains("budget of 1000 steps")),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_deeply_nested_expression_is_compile_error() {
        let dir = TempDir::new().unwrap();
        let depth = 100_000;
        let source = format!(
            "@view\nfunc get_deep() -> (r: felt):\n    return ({}1{})\nend\n",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let artifact = write(dir.path(), "deep.cairo", &source);
        let runtime = InMemoryContractRuntime::default();
        let instance = runtime.create_runtime().await.unwrap();

        let err = instance.deploy(&artifact, &[]).await.unwrap_err();

        match err {
            RuntimeError::Compile { diagnostics, .. } => {
                assert_eq!(diagnostics[0].message, "expression nested too deeply");
                assert_eq!(diagnostics[0].line, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
