//! scada-probe CLI library
//!
//! Lists and runs the built-in operator UI scenarios from the command line.
//!
//! ## Usage
//!
//! ```bash
//! scada-probe list --tag smoke
//! scada-probe run --tag smoke --tag api --report target/scada/report.json
//! scada-probe run --engine chromium --no-sandbox
//! scada-probe config --config suite.yaml
//! ```

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, EngineArg, ListArgs, ListFormat, RunArgs, TagArg,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{scenario_line, summary_line, OutputFormat, ProgressReporter};
