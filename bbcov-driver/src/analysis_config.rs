// SPDX-License-Identifier: Apache-2.0

use bbcov::{AnalysisConfig, IndicatorKind};
use clap::ArgMatches;
use serde::Deserialize;

/// Layout of a `bbcov.toml` file.
#[derive(Deserialize, Default)]
pub struct BbcovToml {
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn cli_value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    matches.try_get_one::<T>(id).ok().flatten().cloned()
}

fn cli_flag(matches: &ArgMatches, id: &str) -> bool {
    cli_value::<bool>(matches, id).unwrap_or(false)
}

/// Helper for the indicator kind: the command line flag, if specified, or
/// the config file value otherwise.
pub fn get_indicator(matches: &ArgMatches, config: &AnalysisConfig) -> IndicatorKind {
    match cli_value::<String>(matches, "indicator") {
        Some(text) => text.parse().unwrap_or(config.indicator),
        None => config.indicator,
    }
}

/// Helper for the ignore list: files given on the command line are added to
/// the ones named in the config file.
pub fn get_ignore_files(matches: &ArgMatches, config: &AnalysisConfig) -> Vec<String> {
    let mut files = config.ignore_files.clone();
    if let Ok(Some(values)) = matches.try_get_many::<String>("ignore_file") {
        for value in values {
            if !files.contains(value) {
                files.push(value.clone());
            }
        }
    }
    files
}

/// Settles the session configuration: command line flags override the
/// config file, which overrides the built-in defaults.
pub fn resolve_analysis_config(
    matches: &ArgMatches,
    config: &Option<AnalysisConfig>,
) -> bbcov::Result<AnalysisConfig> {
    let base = config.clone().unwrap_or_default();
    let resolved = AnalysisConfig {
        jobs: cli_value::<usize>(matches, "jobs").unwrap_or(base.jobs),
        indicator: get_indicator(matches, &base),
        ignore_files: get_ignore_files(matches, &base),
        exclude_corrupted: cli_flag(matches, "exclude_corrupted") || base.exclude_corrupted,
        output_prefix: cli_value::<String>(matches, "output_prefix")
            .unwrap_or_else(|| base.output_prefix.clone()),
        compress_output: cli_flag(matches, "compress_output") || base.compress_output,
        ..base
    };
    resolved.validate()?;
    Ok(resolved)
}
