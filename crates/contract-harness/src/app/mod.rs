//! CLI application layer and composition root wiring.

use std::ffi::OsString;

use anyhow::Result;
use clap::Parser;
use harness_infra::common::{color_init, telemetry};
use tracing::debug;

pub mod commands;
pub mod error;
pub mod handlers;

use crate::adapters::presenter::{ErrorView, Presenter, create_presenter};
use crate::app::commands::{Cli, Commands};
use crate::app::error::CliError;
use crate::app::handlers::HandlerContext;

/// Exit codes following sysexits.h where one applies.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// At least one selected case failed.
    pub const TESTS_FAILED: i32 = 1;
    pub const USAGE: i32 = 64;
    pub const IOERR: i32 = 74;
}

pub struct Application;

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self) -> Result<i32> {
        self.run_with_args(std::env::args_os())
    }

    pub fn run_with_args<I, T>(&self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(err) => {
                err.print()?;
                return Ok(if err.use_stderr() {
                    exit_codes::USAGE
                } else {
                    exit_codes::SUCCESS
                });
            }
        };

        let _telemetry = telemetry::init_tracing(if cli.verbose { "debug" } else { "warn" });
        color_init(cli.no_color);
        let format = cli.effective_format();
        debug!(
            command = ?cli.command,
            suite = %cli.suite.display(),
            format = ?format,
            "CLI command parsed"
        );

        let presenter = create_presenter(&format);
        match self.execute(cli, presenter.as_ref()) {
            Ok(code) => Ok(code),
            Err(err) => Ok(self.handle_error(&err, presenter.as_ref())),
        }
    }

    fn execute(&self, cli: Cli, presenter: &dyn Presenter) -> Result<i32, CliError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::AsyncRuntime)?;

        let Cli { command, suite, .. } = cli;
        let ctx = HandlerContext::new(presenter, suite);
        runtime.block_on(async move {
            match command {
                Commands::RunTests {
                    filter,
                    jobs,
                    timeout_ms,
                } => handlers::handle_run_tests(&ctx, filter, jobs, timeout_ms).await,
                Commands::List { filter } => handlers::handle_list(&ctx, filter).await,
            }
        })
    }

    fn handle_error(&self, err: &CliError, presenter: &dyn Presenter) -> i32 {
        presenter.present_error(&ErrorView {
            message: err.to_string(),
            suggestion: err.suggestion(),
        });
        err.exit_code()
    }
}
