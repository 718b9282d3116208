#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Use-case orchestration crate.

pub mod usecases;
pub use usecases::*;

pub mod common {
    pub use harness_common::*;
}

pub mod domain {
    pub use harness_domain::domain::*;
}
