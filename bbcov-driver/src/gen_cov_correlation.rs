// SPDX-License-Identifier: Apache-2.0

use crate::analysis_config::resolve_analysis_config;
use crate::common::collect_runs;
use crate::report_cli_error::report_anyhow_error_and_exit;
use anyhow::Context;
use bbcov::report::{write_merged_covers, CorrelationSummary};
use bbcov::status::pick_comparator_anchor;
use bbcov::{
    AnalysisConfig, MergeProgress, ProgressSink, RunDescriptor, RunSetOrchestrator, StatusPolicy,
};
use clap::ArgMatches;
use std::path::{Path, PathBuf};

struct StderrProgressSink;

impl ProgressSink for StderrProgressSink {
    fn on_progress(&mut self, p: MergeProgress) {
        eprintln!("{:.1}% of coverage data merged", p.percent);
    }
}

fn status_policy(
    matches: &ArgMatches,
    analysis: &AnalysisConfig,
    runs: &[RunDescriptor],
) -> StatusPolicy {
    if let Some(program) = matches.get_one::<String>("run_cmp") {
        let reference_dir = pick_comparator_anchor(runs)
            .map(|r| r.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        log::info!("comparing runs against {}", reference_dir.display());
        StatusPolicy::Comparator {
            program: PathBuf::from(program),
            reference_dir,
        }
    } else if let Some(program) = matches.get_one::<String>("run_eval") {
        StatusPolicy::Evaluator {
            program: PathBuf::from(program),
        }
    } else {
        analysis.exit_code_policy()
    }
}

fn gen_cov_correlation(
    matches: &ArgMatches,
    config: &Option<AnalysisConfig>,
) -> anyhow::Result<()> {
    let runs = collect_runs(matches, 2)?;
    let analysis = resolve_analysis_config(matches, config)?;
    let policy = status_policy(matches, &analysis, &runs);

    let orchestrator = RunSetOrchestrator::new(runs, &policy, analysis.clone());
    for run in orchestrator.discarded() {
        println!("directory ignored : {}", run.dir.display());
    }
    let (successes, failures) = orchestrator.outcome_counts();
    println!("NbSuccess: {} \t nbFail {}", successes, failures);

    let mut progress = StderrProgressSink;
    let merger = orchestrator.merge(Some(&mut progress))?;

    let out_dir = matches
        .get_one::<String>("output_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let snapshots = write_merged_covers(
        &merger,
        &out_dir,
        &analysis.output_prefix,
        analysis.indicator,
        analysis.compress_output,
    )?;
    for s in &snapshots {
        println!("Num: {}\tMaxindicator: {}", s.snapshot, s.max_indicator);
    }

    if let Some(path) = matches.get_one::<String>("summary_json") {
        let summary = CorrelationSummary {
            reference: merger.reference_dir().to_path_buf(),
            indicator: analysis.indicator,
            merged: merger.globals(),
            discarded: orchestrator
                .discarded()
                .iter()
                .map(|r| r.dir.clone())
                .collect(),
            snapshots,
        };
        let text = serde_json::to_string_pretty(&summary)?;
        std::fs::write(Path::new(path), text + "\n")
            .with_context(|| format!("writing summary to {}", path))?;
    }
    Ok(())
}

pub fn handle_gen_cov_correlation(matches: &ArgMatches, config: &Option<AnalysisConfig>) {
    log::info!("handle_gen_cov_correlation");
    if let Err(e) = gen_cov_correlation(matches, config) {
        report_anyhow_error_and_exit(&e, "gen-cov-correlation");
    }
}
