// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Context};
use bbcov::run::discover_coverage_logs;
use bbcov::RunDescriptor;
use clap::ArgMatches;
use std::path::PathBuf;

/// Coverage log paths named on the command line followed by the ones found
/// under the current directory for `--select-default[=N]` (`0` means all),
/// without repeats.
pub fn collect_coverage_logs(matches: &ArgMatches) -> anyhow::Result<Vec<PathBuf>> {
    let explicit: Vec<PathBuf> = matches
        .get_many::<String>("files")
        .map(|v| v.map(PathBuf::from).collect())
        .unwrap_or_default();

    let discovered = match matches.get_one::<usize>("select_default") {
        Some(&limit) => {
            let limit = if limit == 0 { None } else { Some(limit) };
            discover_coverage_logs(std::path::Path::new("."), limit)
                .context("searching the current directory for coverage logs")?
        }
        None => Vec::new(),
    };

    let mut files = explicit;
    for path in discovered {
        let path = path.strip_prefix(".").map(PathBuf::from).unwrap_or(path);
        if !files.contains(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Maps coverage log paths to runs; any path not named
/// `trace_bb_cov.log-<PID>[.gz]` is rejected.
pub fn runs_from_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<RunDescriptor>> {
    let mut runs = Vec::with_capacity(paths.len());
    for path in paths {
        match RunDescriptor::from_coverage_path(path) {
            Some(run) => runs.push(run),
            None => bail!(
                "{} is not a coverage log (expected trace_bb_cov.log-<PID>[.gz])",
                path.display()
            ),
        }
    }
    Ok(runs)
}

/// Collects the runs of a subcommand, requiring at least `min` of them.
pub fn collect_runs(matches: &ArgMatches, min: usize) -> anyhow::Result<Vec<RunDescriptor>> {
    let files = collect_coverage_logs(matches)?;
    if files.len() < min {
        bail!(
            "at least {} coverage log(s) required, got {}",
            min,
            files.len()
        );
    }
    runs_from_paths(&files)
}
