use clap::Parser;
use clap::Subcommand;
use clap::ValueHint;
use std::path::PathBuf;

use crate::adapters::presenter::OutputFormat;

const AFTER_HELP: &str =
    "Use --help for full details and examples. Use --format json for machine-readable output.";

const LONG_ABOUT: &str = "\
Deploy contract artifacts into fresh runtimes and check what their accessors return.\n\
\n\
Each case runs create_runtime -> deploy -> call -> assert in its own runtime instance.\n\
Cases are read from a TOML suite manifest.";

const AFTER_LONG_HELP: &str = r#"MANIFEST:
    [[case]]
    name = "test_greeting"
    artifact = "contracts/src/main.cairo"
    accessor = "get_greeting"
    expected = ["God bless Ezen-wata"]

    Optional per case: args, constructor_args, expect_error, timeout_ms.

ENVIRONMENT:
    CONTRACT_HARNESS_STEP_TIMEOUT_MS   Per-step timeout (default 10000)
    CONTRACT_HARNESS_CASE_TIMEOUT_MS   Per-case timeout (default 30000)
    CONTRACT_HARNESS_MAX_PARALLEL      Cases run at once (default 4)
    CONTRACT_HARNESS_MAX_INSTANCES     Live runtime instances allowed (default 64)

EXAMPLES:
    contract-harness run-tests
    contract-harness run-tests greeting
    contract-harness --suite suites/counter.toml run-tests --jobs 1
    contract-harness list --json"#;

#[derive(Parser)]
#[command(name = "contract-harness")]
#[command(author, version, propagate_version = true)]
#[command(about = "Contract testing harness for Cairo artifacts")]
#[command(long_about = LONG_ABOUT)]
#[command(after_help = AFTER_HELP)]
#[command(after_long_help = AFTER_LONG_HELP)]
#[command(subcommand_required = true, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suite manifest to load
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        default_value = "harness.toml",
        help_heading = "Suite Options"
    )]
    pub suite: PathBuf,

    /// Output format (text or json)
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        value_name = "FORMAT",
        default_value_t = OutputFormat::Text,
        help_heading = "Output Options"
    )]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true, help_heading = "Output Options")]
    pub json: bool,

    /// Disable colored output (also respects NO_COLOR)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new(),
        help_heading = "Output Options"
    )]
    pub no_color: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(short, long, global = true, help_heading = "Debug Options")]
    pub verbose: bool,
}

impl Cli {
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the cases of the suite manifest
    #[command(long_about = "\
Run every case of the suite manifest, or only those whose name contains FILTER.

Exits 0 when every selected case passes and 1 otherwise.")]
    #[command(after_long_help = "\
EXAMPLES:
    contract-harness run-tests
    contract-harness run-tests test_greeting
    contract-harness run-tests --jobs 8 --timeout-ms 5000")]
    RunTests {
        /// Only run cases whose name contains this text
        #[arg(value_name = "FILTER")]
        filter: Option<String>,

        /// Cases run at once (overrides CONTRACT_HARNESS_MAX_PARALLEL)
        #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
        jobs: Option<u64>,

        /// Per-case timeout in milliseconds (overrides CONTRACT_HARNESS_CASE_TIMEOUT_MS)
        #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout_ms: Option<u64>,
    },

    /// List the cases of the suite manifest
    List {
        /// Only list cases whose name contains this text
        #[arg(value_name = "FILTER")]
        filter: Option<String>,
    },
}
