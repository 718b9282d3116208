//! Mock contract runtime for use case tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;

use super::mock_error::MockError;
use crate::domain::{ArtifactPath, ContractAddress, Felt, RuntimeId};
use crate::usecases::ports::{
    ContractRuntime, InvocationMode, RuntimeError, RuntimeHandle, RuntimeInstance,
};

#[derive(Debug, Clone)]
pub struct Invocation {
    pub instance: RuntimeId,
    pub address: ContractAddress,
    pub function: String,
    pub args: Vec<Felt>,
    pub mode: InvocationMode,
}

#[derive(Default)]
struct MockConfig {
    functions: HashMap<String, Vec<Felt>>,
    init_error: Option<MockError>,
    deploy_errors: HashMap<String, MockError>,
    deploy_error: Option<MockError>,
    call_error: Option<MockError>,
    deploy_delay: Option<Duration>,
    call_delay: Option<Duration>,
}

#[derive(Default)]
struct Recorder {
    create_calls: AtomicUsize,
    deploy_calls: AtomicUsize,
    invoke_calls: AtomicUsize,
    live_instances: AtomicUsize,
    peak_instances: AtomicUsize,
    instance_ids: Mutex<Vec<RuntimeId>>,
    invocations: Mutex<Vec<Invocation>>,
}

/// Runtime whose contracts expose a fixed table of functions, regardless of
/// which artifact is deployed.
#[derive(Default)]
pub struct MockContractRuntime {
    config: Arc<MockConfig>,
    recorder: Arc<Recorder>,
}

impl MockContractRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MockContractRuntimeBuilder {
        MockContractRuntimeBuilder::new()
    }

    pub fn create_call_count(&self) -> usize {
        self.recorder.create_calls.load(Ordering::SeqCst)
    }

    pub fn deploy_call_count(&self) -> usize {
        self.recorder.deploy_calls.load(Ordering::SeqCst)
    }

    pub fn invoke_call_count(&self) -> usize {
        self.recorder.invoke_calls.load(Ordering::SeqCst)
    }

    pub fn live_instances(&self) -> usize {
        self.recorder.live_instances.load(Ordering::SeqCst)
    }

    /// Most instances alive at the same time.
    pub fn peak_instances(&self) -> usize {
        self.recorder.peak_instances.load(Ordering::SeqCst)
    }

    pub fn instance_ids(&self) -> Vec<RuntimeId> {
        self.recorder.instance_ids.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.recorder.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContractRuntime for MockContractRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_runtime(&self) -> Result<RuntimeHandle, RuntimeError> {
        self.recorder.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref err) = self.config.init_error {
            return Err(err.to_runtime_error("mock"));
        }

        let id = RuntimeId::new();
        self.recorder.instance_ids.lock().unwrap().push(id);
        let live = self.recorder.live_instances.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder
            .peak_instances
            .fetch_max(live, Ordering::SeqCst);
        Ok(Arc::new(MockInstance {
            id,
            config: Arc::clone(&self.config),
            recorder: Arc::clone(&self.recorder),
            next_address: AtomicU64::new(0x1000),
            deployed: Mutex::new(Vec::new()),
        }))
    }
}

struct MockInstance {
    id: RuntimeId,
    config: Arc<MockConfig>,
    recorder: Arc<Recorder>,
    next_address: AtomicU64,
    deployed: Mutex<Vec<ContractAddress>>,
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        self.recorder.live_instances.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RuntimeInstance for MockInstance {
    fn id(&self) -> RuntimeId {
        self.id
    }

    async fn deploy(
        &self,
        artifact: &ArtifactPath,
        _constructor_args: &[Felt],
    ) -> Result<ContractAddress, RuntimeError> {
        self.recorder.deploy_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.config.deploy_delay {
            tokio::time::sleep(delay).await;
        }

        let name = artifact.to_string();
        let configured = self
            .config
            .deploy_errors
            .get(&name)
            .or(self.config.deploy_error.as_ref());
        if let Some(err) = configured {
            return Err(err.to_runtime_error(&name));
        }

        let address =
            ContractAddress::new(Felt::from(self.next_address.fetch_add(1, Ordering::SeqCst)));
        self.deployed.lock().unwrap().push(address.clone());
        Ok(address)
    }

    async fn invoke(
        &self,
        contract: &ContractAddress,
        function: &str,
        args: &[Felt],
        mode: InvocationMode,
    ) -> Result<Vec<Felt>, RuntimeError> {
        self.recorder.invoke_calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.invocations.lock().unwrap().push(Invocation {
            instance: self.id,
            address: contract.clone(),
            function: function.to_string(),
            args: args.to_vec(),
            mode,
        });

        if let Some(delay) = self.config.call_delay {
            tokio::time::sleep(delay).await;
        }

        if !self.deployed.lock().unwrap().contains(contract) {
            return Err(RuntimeError::UnknownContract(contract.to_string()));
        }

        if let Some(ref err) = self.config.call_error {
            return Err(err.to_runtime_error(function));
        }

        self.config
            .functions
            .get(function)
            .cloned()
            .ok_or_else(|| RuntimeError::NoSuchFunction(function.to_string()))
    }
}

#[derive(Default)]
pub struct MockContractRuntimeBuilder {
    config: MockConfig,
}

impl MockContractRuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, name: impl Into<String>, values: Vec<Felt>) -> Self {
        self.config.functions.insert(name.into(), values);
        self
    }

    pub fn with_init_error(mut self, error: MockError) -> Self {
        self.config.init_error = Some(error);
        self
    }

    pub fn with_deploy_error(mut self, error: MockError) -> Self {
        self.config.deploy_error = Some(error);
        self
    }

    /// Fails deployment only for the artifact whose display form is `artifact`.
    pub fn with_deploy_error_for(mut self, artifact: impl Into<String>, error: MockError) -> Self {
        self.config.deploy_errors.insert(artifact.into(), error);
        self
    }

    pub fn with_call_error(mut self, error: MockError) -> Self {
        self.config.call_error = Some(error);
        self
    }

    pub fn with_deploy_delay(mut self, delay: Duration) -> Self {
        self.config.deploy_delay = Some(delay);
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.config.call_delay = Some(delay);
        self
    }

    pub fn build(self) -> MockContractRuntime {
        MockContractRuntime {
            config: Arc::new(self.config),
            recorder: Arc::new(Recorder::default()),
        }
    }
}
