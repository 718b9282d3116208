//! Suite manifests: TOML files listing test cases.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ArtifactPath, Literal};
use crate::usecases::{ErrorKind, Expectation, TestCase};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Cannot read suite manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid suite manifest {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Invalid case '{case}' in {path}: {message}")]
    Case {
        path: String,
        case: String,
        message: String,
    },
}

impl ManifestError {
    pub fn is_io(&self) -> bool {
        matches!(self, ManifestError::Io { .. })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default, rename = "case")]
    cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCase {
    name: String,
    artifact: PathBuf,
    accessor: String,
    expected: Option<Vec<Literal>>,
    #[serde(default)]
    args: Vec<Literal>,
    #[serde(default)]
    constructor_args: Vec<Literal>,
    expect_error: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SuiteManifest {
    path: PathBuf,
    cases: Vec<TestCase>,
}

impl SuiteManifest {
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let manifest = Self::parse(&source, path)?;
        debug!(path = %path.display(), cases = manifest.cases.len(), "Suite manifest loaded");
        Ok(manifest)
    }

    /// Parses manifest text. Relative artifact paths resolve against the
    /// directory containing `path`.
    pub fn parse(source: &str, path: &Path) -> Result<Self, ManifestError> {
        let label = path.display().to_string();
        let raw: RawManifest = toml::from_str(source).map_err(|err| ManifestError::Parse {
            path: label.clone(),
            message: err.message().to_string(),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut seen = HashSet::new();
        let mut cases = Vec::with_capacity(raw.cases.len());
        for raw_case in raw.cases {
            let case_error = |message: String| ManifestError::Case {
                path: label.clone(),
                case: raw_case.name.clone(),
                message,
            };

            if raw_case.name.trim().is_empty() {
                return Err(case_error("name must not be empty".to_string()));
            }
            if !seen.insert(raw_case.name.clone()) {
                return Err(case_error("duplicate case name".to_string()));
            }
            if raw_case.accessor.trim().is_empty() {
                return Err(case_error("accessor must not be empty".to_string()));
            }

            let expectation = match (&raw_case.expected, &raw_case.expect_error) {
                (Some(_), Some(_)) => {
                    return Err(case_error(
                        "set either 'expected' or 'expect_error', not both".to_string(),
                    ));
                }
                (None, None) => {
                    return Err(case_error(
                        "missing 'expected' (or 'expect_error')".to_string(),
                    ));
                }
                (Some(expected), None) => Expectation::Values(expected.clone()),
                (None, Some(kind)) => Expectation::Error(
                    kind.parse::<ErrorKind>()
                        .map_err(|err| case_error(err.to_string()))?,
                ),
            };

            let timeout = match raw_case.timeout_ms {
                Some(0) => {
                    return Err(case_error("timeout_ms must be positive".to_string()));
                }
                Some(ms) => Some(Duration::from_millis(ms)),
                None => None,
            };

            cases.push(TestCase {
                name: raw_case.name.clone(),
                artifact: ArtifactPath::new(raw_case.artifact.clone()).resolve_against(base),
                accessor: raw_case.accessor.clone(),
                args: raw_case.args.clone(),
                constructor_args: raw_case.constructor_args.clone(),
                expectation,
                timeout,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            cases,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn into_cases(self) -> Vec<TestCase> {
        self.cases
    }
}
