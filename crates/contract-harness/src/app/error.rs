use harness_infra::ManifestError;
use thiserror::Error;

use crate::app::exit_codes;

/// Failures that stop a command before any case runs.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to start async runtime: {0}")]
    AsyncRuntime(#[source] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Manifest(err) if err.is_io() => exit_codes::IOERR,
            CliError::Manifest(_) => exit_codes::USAGE,
            CliError::AsyncRuntime(_) => exit_codes::IOERR,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            CliError::Manifest(ManifestError::Io { .. }) => Some(
                "Pass the manifest with --suite <PATH> or run from the directory containing harness.toml."
                    .to_string(),
            ),
            CliError::Manifest(_) => Some(
                "Each [[case]] needs name, artifact, accessor and one of expected or expect_error."
                    .to_string(),
            ),
            CliError::AsyncRuntime(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_sysexits() {
        let io = CliError::Manifest(ManifestError::Io {
            path: "harness.toml".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        let parse = CliError::Manifest(ManifestError::Parse {
            path: "harness.toml".to_string(),
            message: "expected `=`".to_string(),
        });

        assert_eq!(io.exit_code(), 74);
        assert_eq!(parse.exit_code(), 64);
        assert!(parse.suggestion().is_some());
    }
}
