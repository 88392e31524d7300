// SPDX-License-Identifier: Apache-2.0

use crate::analysis_config::resolve_analysis_config;
use crate::common::collect_runs;
use crate::report_cli_error::report_anyhow_error_and_exit;
use anyhow::Context;
use bbcov::report::write_plain_covers;
use bbcov::{AnalysisConfig, RunData};
use clap::ArgMatches;

fn gen_cov(matches: &ArgMatches, config: &Option<AnalysisConfig>) -> anyhow::Result<()> {
    let runs = collect_runs(matches, 1)?;
    let analysis = resolve_analysis_config(matches, config)?;
    let filter = analysis.block_filter();
    for run in &runs {
        let data = RunData::load(run).with_context(|| format!("loading run {}", run))?;
        let written = write_plain_covers(
            &data,
            &filter,
            &analysis.output_prefix,
            analysis.compress_output,
        )?;
        for path in written {
            log::info!("wrote {}", path.display());
        }
    }
    Ok(())
}

pub fn handle_gen_cov(matches: &ArgMatches, config: &Option<AnalysisConfig>) {
    log::info!("handle_gen_cov");
    if let Err(e) = gen_cov(matches, config) {
        report_anyhow_error_and_exit(&e, "gen-cov");
    }
}
