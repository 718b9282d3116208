//! Expected values written by test authors.

use std::fmt;

use serde::Deserialize;

use super::felt::{Felt, FeltParseError};
use super::short_string::{ShortStringError, encode_short_string};

/// A literal compared against one returned felt.
///
/// In manifests a TOML string is a short string, a TOML integer is a felt, and
/// `{ felt = "0x..." }` is a felt written as text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLiteral")]
pub enum Literal {
    Felt(Felt),
    ShortString(String),
}

impl Literal {
    pub fn short_string(text: impl Into<String>) -> Self {
        Self::ShortString(text.into())
    }

    pub fn felt(value: impl Into<Felt>) -> Self {
        Self::Felt(value.into())
    }

    pub fn to_felt(&self) -> Result<Felt, ShortStringError> {
        match self {
            Self::Felt(felt) => Ok(felt.clone()),
            Self::ShortString(text) => encode_short_string(text),
        }
    }

    pub fn is_short_string(&self) -> bool {
        matches!(self, Self::ShortString(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Felt(felt) => write!(f, "{}", felt),
            Self::ShortString(text) => write!(f, "'{}'", text),
        }
    }
}

impl From<&str> for Literal {
    fn from(text: &str) -> Self {
        Self::short_string(text)
    }
}

impl From<u64> for Literal {
    fn from(value: u64) -> Self {
        Self::felt(value)
    }
}

impl From<Felt> for Literal {
    fn from(value: Felt) -> Self {
        Self::Felt(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLiteral {
    Int(i64),
    Text(String),
    Felt { felt: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LiteralError {
    #[error(transparent)]
    ShortString(#[from] ShortStringError),
    #[error(transparent)]
    Felt(#[from] FeltParseError),
}

impl TryFrom<RawLiteral> for Literal {
    type Error = LiteralError;

    fn try_from(raw: RawLiteral) -> Result<Self, Self::Error> {
        match raw {
            RawLiteral::Int(value) => Ok(Self::Felt(Felt::from(value))),
            RawLiteral::Text(text) => {
                encode_short_string(&text)?;
                Ok(Self::ShortString(text))
            }
            RawLiteral::Felt { felt } => Ok(Self::Felt(Felt::parse(&felt)?)),
        }
    }
}
