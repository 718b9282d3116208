//! Harness configuration.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::infra::runtime::DEFAULT_MAX_INSTANCES;
use crate::usecases::{DEFAULT_CASE_TIMEOUT, DEFAULT_MAX_PARALLEL, DEFAULT_STEP_TIMEOUT};

pub const STEP_TIMEOUT_ENV: &str = "CONTRACT_HARNESS_STEP_TIMEOUT_MS";
pub const CASE_TIMEOUT_ENV: &str = "CONTRACT_HARNESS_CASE_TIMEOUT_MS";
pub const MAX_PARALLEL_ENV: &str = "CONTRACT_HARNESS_MAX_PARALLEL";
pub const MAX_INSTANCES_ENV: &str = "CONTRACT_HARNESS_MAX_INSTANCES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    step_timeout: Duration,
    case_timeout: Duration,
    max_parallel: usize,
    max_instances: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl HarnessConfig {
    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    pub fn case_timeout(&self) -> Duration {
        self.case_timeout
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    pub fn from_env() -> Self {
        Self {
            step_timeout: Duration::from_millis(parse_env_u64(
                STEP_TIMEOUT_ENV,
                DEFAULT_STEP_TIMEOUT.as_millis() as u64,
            )),
            case_timeout: Duration::from_millis(parse_env_u64(
                CASE_TIMEOUT_ENV,
                DEFAULT_CASE_TIMEOUT.as_millis() as u64,
            )),
            max_parallel: parse_env_usize(MAX_PARALLEL_ENV, DEFAULT_MAX_PARALLEL),
            max_instances: parse_env_usize(MAX_INSTANCES_ENV, DEFAULT_MAX_INSTANCES),
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_case_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = timeout;
        self
    }

    /// Zero is treated as one.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = max_instances;
        self
    }
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return default,
    };
    if value.trim().is_empty() {
        return default;
    }
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => parsed,
        _ => {
            warn!(value = %value, key, "Invalid numeric config; using default");
            default
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return default,
    };
    if value.trim().is_empty() {
        return default;
    }
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => parsed,
        _ => {
            warn!(value = %value, key, "Invalid numeric config; using default");
            default
        }
    }
}
