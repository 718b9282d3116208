#![deny(clippy::all)]
//! Runtime adapter, configuration and suite manifests.

pub mod cairo;
mod config;
mod manifest;
mod runtime;

pub use config::{
    CASE_TIMEOUT_ENV, HarnessConfig, MAX_INSTANCES_ENV, MAX_PARALLEL_ENV, STEP_TIMEOUT_ENV,
};
pub use manifest::{ManifestError, SuiteManifest};
pub use runtime::{DEFAULT_MAX_INSTANCES, InMemoryContractRuntime};
