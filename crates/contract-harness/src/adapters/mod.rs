//! Output adapters.

pub mod presenter;
