//! Identifiers for runtime instances, deployments and artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::felt::Felt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(Uuid);

impl RuntimeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell instances apart in logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RuntimeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractAddress(Felt);

impl ContractAddress {
    pub fn new(value: Felt) -> Self {
        Self(value)
    }

    pub fn as_felt(&self) -> &Felt {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex_string())
    }
}

/// Location of contract source. The harness never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPath(PathBuf);

impl ArtifactPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a relative path onto `base`; absolute paths are kept as is.
    pub fn resolve_against(&self, base: &Path) -> Self {
        if self.0.is_absolute() {
            self.clone()
        } else {
            Self(base.join(&self.0))
        }
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for ArtifactPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for ArtifactPath {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_ids_are_unique() {
        assert_ne!(RuntimeId::new(), RuntimeId::new());
        assert_eq!(RuntimeId::new().short().len(), 8);
    }

    #[test]
    fn test_contract_address_displays_as_hex() {
        let address = ContractAddress::new(Felt::from(0x1000u64));
        assert_eq!(address.to_string(), "0x1000");
    }

    #[test]
    fn test_artifact_resolves_relative_paths_only() {
        let base = Path::new("/suite");
        assert_eq!(
            ArtifactPath::from("contracts/src/main.cairo")
                .resolve_against(base)
                .as_path(),
            Path::new("/suite/contracts/src/main.cairo")
        );
        assert_eq!(
            ArtifactPath::from("/abs/main.cairo")
                .resolve_against(base)
                .as_path(),
            Path::new("/abs/main.cairo")
        );
    }
}
