#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod adapters;
mod app;

pub use adapters::presenter::OutputFormat;
pub use app::Application;
pub use app::commands::{Cli, Commands};
pub use app::exit_codes;
