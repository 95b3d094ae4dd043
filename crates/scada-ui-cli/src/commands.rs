//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use scada_ui::{Engine, SuiteConfig, Tag};
use std::path::PathBuf;

/// scada-probe: end-to-end scenarios for the SCADA operator dashboard
#[derive(Parser, Debug)]
#[command(name = "scada-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit log events as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the built-in scenarios
    List(ListArgs),

    /// Run scenarios and report the results
    Run(RunArgs),

    /// Print the effective suite configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list scenarios carrying this tag
    #[arg(short, long)]
    pub tag: Option<TagArg>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: ListFormat,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Run scenarios carrying any of these tags (repeatable)
    #[arg(short, long)]
    pub tag: Vec<TagArg>,

    /// Run scenarios whose name contains this text
    #[arg(short, long)]
    pub name: Option<String>,

    /// YAML suite configuration
    #[arg(short, long, env = "SCADA_PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Engine rendering the pages
    #[arg(short, long)]
    pub engine: Option<EngineArg>,

    /// Show the Chromium window
    #[arg(long)]
    pub headed: bool,

    /// Chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Disable the Chromium sandbox
    #[arg(long)]
    pub no_sandbox: bool,

    /// HTML fixture to open instead of the bundled one
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Default wait timeout in milliseconds
    #[arg(long, env = "SCADA_PROBE_TIMEOUT_MS")]
    pub timeout: Option<u64>,

    /// Write a JSON report to this file
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Skip remaining scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,
}

impl RunArgs {
    /// Selected tags
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        self.tag.iter().copied().map(Tag::from).collect()
    }

    /// Layer the flags over a file-based configuration
    #[must_use]
    pub fn apply(&self, mut config: SuiteConfig) -> SuiteConfig {
        if let Some(engine) = self.engine {
            config = config.with_engine(engine.into());
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(path) = &self.chromium_path {
            config.chromium_path = Some(path.clone());
        }
        if self.no_sandbox {
            config.no_sandbox = true;
        }
        if let Some(html) = &self.html {
            config = config.with_html_path(html.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(report) = &self.report {
            config.report_path = Some(report.clone());
        }
        if self.fail_fast {
            config = config.with_fail_fast(true);
        }
        config
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// YAML suite configuration to resolve
    #[arg(short, long, env = "SCADA_PROBE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Listing format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// One scenario per line
    #[default]
    Text,
    /// JSON array
    Json,
}

impl From<ListFormat> for crate::output::OutputFormat {
    fn from(arg: ListFormat) -> Self {
        match arg {
            ListFormat::Text => Self::Text,
            ListFormat::Json => Self::Json,
        }
    }
}

/// Scenario tag argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagArg {
    /// Fast checks of the main flow
    Smoke,
    /// Behavior that must not regress
    Regression,
    /// Network interception and direct API calls
    Api,
}

impl From<TagArg> for Tag {
    fn from(arg: TagArg) -> Self {
        match arg {
            TagArg::Smoke => Self::Smoke,
            TagArg::Regression => Self::Regression,
            TagArg::Api => Self::Api,
        }
    }
}

/// Engine argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineArg {
    /// In-process model of the operator UI
    Simulated,
    /// Headless Chromium over CDP (needs the `browser` feature)
    Chromium,
}

impl From<EngineArg> for Engine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Simulated => Self::Simulated,
            EngineArg::Chromium => Self::Chromium,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_list_command() {
            let cli = Cli::parse_from(["scada-probe", "list"]);
            if let Commands::List(args) = cli.command {
                assert_eq!(args.tag, None);
                assert_eq!(args.format, ListFormat::Text);
            } else {
                panic!("expected List command");
            }
        }

        #[test]
        fn test_parse_list_with_tag_and_format() {
            let cli = Cli::parse_from(["scada-probe", "list", "--tag", "api", "-f", "json"]);
            if let Commands::List(args) = cli.command {
                assert_eq!(args.tag, Some(TagArg::Api));
                assert_eq!(args.format, ListFormat::Json);
            } else {
                panic!("expected List command");
            }
        }

        #[test]
        fn test_parse_run_with_repeated_tags() {
            let cli = Cli::parse_from(["scada-probe", "run", "-t", "smoke", "-t", "regression"]);
            if let Commands::Run(args) = cli.command {
                assert_eq!(args.tags(), vec![Tag::Smoke, Tag::Regression]);
            } else {
                panic!("expected Run command");
            }
        }

        #[test]
        fn test_parse_invalid_tag() {
            let result = Cli::try_parse_from(["scada-probe", "run", "--tag", "nightly"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_global_flags() {
            let cli = Cli::parse_from(["scada-probe", "-vv", "--color", "never", "list"]);
            assert_eq!(cli.verbose, 2);
            assert!(!cli.quiet);
            assert!(matches!(cli.color, ColorArg::Never));
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["scada-probe"]).is_err());
        }
    }

    mod run_args_tests {
        use super::*;

        fn run_args(args: &[&str]) -> RunArgs {
            let mut argv = vec!["scada-probe", "run"];
            argv.extend_from_slice(args);
            match Cli::parse_from(argv).command {
                Commands::Run(args) => args,
                other => panic!("expected Run command, got {other:?}"),
            }
        }

        #[test]
        fn test_no_flags_keep_file_values() {
            let args = RunArgs {
                tag: Vec::new(),
                name: None,
                config: None,
                engine: None,
                headed: false,
                chromium_path: None,
                no_sandbox: false,
                html: None,
                timeout: None,
                report: None,
                fail_fast: false,
            };
            let file = SuiteConfig::default().with_timeout(9000);
            assert_eq!(args.apply(file.clone()), file);
        }

        #[test]
        fn test_flags_override_file_values() {
            let config = run_args(&[
                "--engine",
                "chromium",
                "--headed",
                "--no-sandbox",
                "--timeout",
                "1500",
                "--html",
                "ui.html",
                "--report",
                "out/report.json",
                "--fail-fast",
            ])
            .apply(SuiteConfig::default());

            assert_eq!(config.engine, Engine::Chromium);
            assert!(!config.headless);
            assert!(config.no_sandbox);
            assert_eq!(config.timeout_ms, 1500);
            assert_eq!(config.html_path, Some(PathBuf::from("ui.html")));
            assert_eq!(config.report_path, Some(PathBuf::from("out/report.json")));
            assert!(config.fail_fast);
        }

        #[test]
        fn test_name_filter() {
            let args = run_args(&["--name", "login"]);
            assert_eq!(args.name.as_deref(), Some("login"));
        }
    }

    mod conversion_tests {
        use super::*;
        use crate::config::ColorChoice;

        #[test]
        fn test_tag_arg_covers_every_tag() {
            let converted: Vec<Tag> = TagArg::value_variants()
                .iter()
                .copied()
                .map(Tag::from)
                .collect();
            assert_eq!(converted, Tag::ALL.to_vec());
        }

        #[test]
        fn test_color_arg() {
            assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
            assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
            assert_eq!(ColorChoice::from(ColorArg::Auto), ColorChoice::Auto);
        }
    }
}
