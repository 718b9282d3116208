#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Infrastructure adapters crate.

pub mod infra;
pub use infra::*;

pub mod common {
    pub use harness_common::*;
}

pub mod domain {
    pub use harness_domain::domain::*;
}

pub mod usecases {
    pub use harness_usecases::usecases::*;
}
