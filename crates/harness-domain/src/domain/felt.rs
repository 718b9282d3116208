//! Starknet field element.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::OnceLock;

use num_bigint::BigUint;
use num_traits::{Num, One, Zero};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// `P = 2^251 + 17 * 2^192 + 1`
fn prime() -> &'static BigUint {
    static PRIME: OnceLock<BigUint> = OnceLock::new();
    PRIME.get_or_init(|| {
        (BigUint::one() << 251u32) + (BigUint::from(17u32) << 192u32) + BigUint::one()
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeltParseError {
    #[error("Felt literal cannot be empty")]
    Empty,
    #[error("Invalid felt literal '{0}'")]
    Invalid(String),
    #[error("Felt literal '{0}' is outside the field")]
    OutOfRange(String),
}

/// An element of the Starknet prime field. Always stored reduced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Felt(BigUint);

impl Felt {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn one() -> Self {
        Self(BigUint::one())
    }

    pub fn from_biguint(value: BigUint) -> Self {
        Self(value % prime())
    }

    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self::from_biguint(BigUint::from_bytes_be(bytes))
    }

    /// Parses a decimal or `0x` hex literal, optionally negated with a leading `-`.
    pub fn parse(text: &str) -> Result<Self, FeltParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FeltParseError::Empty);
        }

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (radix, body) = match digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Some(hex) => (16, hex),
            None => (10, digits),
        };
        if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
            return Err(FeltParseError::Invalid(trimmed.to_string()));
        }
        let parsed = BigUint::from_str_radix(body, radix)
            .map_err(|_| FeltParseError::Invalid(trimmed.to_string()))?;

        if &parsed >= prime() {
            return Err(FeltParseError::OutOfRange(trimmed.to_string()));
        }

        let felt = Self(parsed);
        Ok(if negative { -felt } else { felt })
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Big-endian bytes without leading zeros; zero encodes as an empty slice.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        if self.is_zero() {
            return Vec::new();
        }
        self.0.to_bytes_be()
    }

    pub fn to_hex_string(&self) -> String {
        format!("0x{:x}", self.0)
    }

    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        let exponent = prime() - BigUint::from(2u32);
        Some(Self(self.0.modpow(&exponent, prime())))
    }

    /// Field division; `None` when dividing by zero.
    pub fn checked_div(&self, rhs: &Felt) -> Option<Self> {
        rhs.inverse().map(|inv| self * &inv)
    }
}

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u32> for Felt {
    fn from(value: u32) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<i64> for Felt {
    fn from(value: i64) -> Self {
        let magnitude = Self(BigUint::from(value.unsigned_abs()));
        if value < 0 { -magnitude } else { magnitude }
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::LowerHex for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl Add<&Felt> for &Felt {
    type Output = Felt;

    fn add(self, rhs: &Felt) -> Felt {
        Felt::from_biguint(&self.0 + &rhs.0)
    }
}

impl Add for Felt {
    type Output = Felt;

    fn add(self, rhs: Felt) -> Felt {
        &self + &rhs
    }
}

impl Sub<&Felt> for &Felt {
    type Output = Felt;

    fn sub(self, rhs: &Felt) -> Felt {
        Felt::from_biguint(&self.0 + prime() - &rhs.0)
    }
}

impl Sub for Felt {
    type Output = Felt;

    fn sub(self, rhs: Felt) -> Felt {
        &self - &rhs
    }
}

impl Mul<&Felt> for &Felt {
    type Output = Felt;

    fn mul(self, rhs: &Felt) -> Felt {
        Felt::from_biguint(&self.0 * &rhs.0)
    }
}

impl Mul for Felt {
    type Output = Felt;

    fn mul(self, rhs: Felt) -> Felt {
        &self * &rhs
    }
}

impl Neg for &Felt {
    type Output = Felt;

    fn neg(self) -> Felt {
        &Felt::zero() - self
    }
}

impl Neg for Felt {
    type Output = Felt;

    fn neg(self) -> Felt {
        -&self
    }
}
