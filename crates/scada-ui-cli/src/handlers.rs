//! Subcommand implementations

use crate::commands::{ConfigArgs, ListArgs, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, ProgressReporter};
use scada_ui::{
    scenarios, ScadaFixture, Scenario, ScenarioFilter, SuiteConfig, SuiteReport, SuiteRunner, Tag,
};
use serde::Serialize;
use std::path::Path;

/// Listing entry for one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioListing {
    /// Scenario name
    pub name: &'static str,
    /// Scenario tags
    pub tags: Vec<Tag>,
}

impl From<&Scenario> for ScenarioListing {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name,
            tags: scenario.tags.to_vec(),
        }
    }
}

/// Built-in scenarios carrying `tag` (all when `None`)
#[must_use]
pub fn listings(tag: Option<Tag>) -> Vec<ScenarioListing> {
    scenarios::ALL
        .iter()
        .filter(|s| tag.map_or(true, |t| s.has_tag(t)))
        .map(ScenarioListing::from)
        .collect()
}

/// Render the listing in `format`
pub fn render_listings(entries: &[ScenarioListing], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        OutputFormat::Text => {
            let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
            Ok(entries
                .iter()
                .map(|e| {
                    let tags: Vec<&str> = e.tags.iter().map(|t| t.as_str()).collect();
                    format!("{:<width$}  {}", e.name, tags.join(", "))
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

/// `list`
pub fn run_list(args: &ListArgs) -> CliResult<()> {
    let entries = listings(args.tag.map(Tag::from));
    println!("{}", render_listings(&entries, args.format.into())?);
    Ok(())
}

/// Suite configuration from an optional YAML file
pub fn load_suite_config(path: Option<&Path>) -> CliResult<SuiteConfig> {
    match path {
        Some(path) => Ok(SuiteConfig::load(path)?),
        None => Ok(SuiteConfig::default()),
    }
}

/// `config`
pub fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = load_suite_config(args.config.as_deref())?;
    print!("{}", serde_yaml_ng::to_string(&config)?);
    Ok(())
}

/// Filter built from the `run` flags
#[must_use]
pub fn scenario_filter(args: &RunArgs) -> ScenarioFilter {
    let mut filter = args
        .tags()
        .into_iter()
        .fold(ScenarioFilter::new(), ScenarioFilter::with_tag);
    if let Some(name) = &args.name {
        filter = filter.with_name(name.clone());
    }
    filter
}

/// `run`
pub fn run_scenarios(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let suite = args.apply(load_suite_config(args.config.as_deref())?);
    suite.validate()?;

    let filter = scenario_filter(args);
    let selected = scenarios::ALL.iter().filter(|s| filter.matches(s)).count();
    if selected == 0 {
        return Err(CliError::invalid_argument(
            "no built-in scenario matches the given --tag/--name filters",
        ));
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("failed to start async runtime: {e}")))?;

    let mut reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
            .with_steps(config.verbosity.is_verbose());
    reporter.header(&format!("scada-probe: {selected} scenarios on {}", suite.engine));

    let report = rt.block_on(async {
        let fixture = ScadaFixture::launch(&suite).await?;
        let runner = SuiteRunner::new(fixture)
            .with_filter(filter)
            .with_fail_fast(suite.fail_fast);

        reporter.start_progress(selected as u64, "scenarios");
        let report = runner
            .run_with(scenarios::ALL, |result| {
                reporter.set_message(&result.name);
                reporter.scenario_result(result);
            })
            .await;
        reporter.finish();

        if let Err(err) = runner.fixture().browser().close().await {
            tracing::warn!(error = %err, "failed to close browser");
        }
        Ok::<_, CliError>(report)
    })?;

    reporter.report_summary(&report);
    if let Some(path) = &suite.report_path {
        report.write_json(path)?;
        reporter.info(&format!("report written to {}", path.display()));
    }

    check_report(&report)
}

/// Non-zero exit when any scenario failed
pub fn check_report(report: &SuiteReport) -> CliResult<()> {
    if report.all_passed() {
        return Ok(());
    }
    let failures = report.failures();
    let names: Vec<&str> = failures.iter().map(|r| r.name.as_str()).collect();
    Err(CliError::scenario_failure(format!(
        "{} of {} scenarios failed: {}",
        report.failed_count(),
        report.total(),
        names.join(", ")
    )))
}
