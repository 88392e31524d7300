// SPDX-License-Identifier: Apache-2.0

//! This is a command line driver program that correlates basic-block
//! coverage divergence with run outcomes.
//!
//! Commands are given like:
//!
//! ```text
//! bbcov-driver <global-options> <command> <command-args-and-options>
//! ```
//!
//! Commands are:
//!
//! - gen-cov: Writes each run's per-snapshot cover next to its logs.
//! - gen-cov-correlation: Merges all runs against a reference and writes one
//!   correlation cover per snapshot.
//! - catalog: Dumps a block-metadata log, one block per line.
//!
//! Sample usage:
//!
//! ```shell
//! $ cargo run -- gen-cov dd.line/ref/trace_bb_cov.log-1234
//! $ cargo run -- --config=$HOME/bbcov.toml \
//!     gen-cov-correlation --select-default --indicator=standard
//! $ cargo run -- \
//!     gen-cov-correlation --run-eval=./eval.sh --output-dir=out \
//!     runs/*/trace_bb_cov.log-*
//! ```

mod analysis_config;
mod catalog_dump;
mod common;
mod gen_cov;
mod gen_cov_correlation;
mod report_cli_error;

use crate::analysis_config::BbcovToml;
use bbcov::AnalysisConfig;
use clap::{Arg, ArgAction};
use report_cli_error::report_cli_error_and_exit;

trait AppExt {
    fn add_run_selection_args(self) -> Self;
    fn add_output_args(self) -> Self;
    fn add_bool_arg(self, id: &'static str, long: &'static str, help: &'static str) -> Self;
}

impl AppExt for clap::Command {
    fn add_run_selection_args(self) -> Self {
        self.arg(
            Arg::new("select_default")
                .long("select-default")
                .value_name("N")
                .help("Also use the first N coverage logs found under the current directory (all when N is 0 or omitted)")
                .num_args(0..=1)
                .default_missing_value("0")
                .value_parser(clap::value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("files")
                .value_name("TRACE_BB_COV_LOG")
                .help("Coverage logs named trace_bb_cov.log-<PID>[.gz]")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ignore_file")
                .long("ignore-file")
                .value_name("SOURCE_FILE")
                .help("Leave out blocks located in this source file (repeatable)")
                .action(ArgAction::Append),
        )
        .add_bool_arg(
            "exclude_corrupted",
            "exclude-corrupted",
            "Leave out blocks whose metadata log looks truncated or interleaved",
        )
    }

    fn add_output_args(self) -> Self {
        self.arg(
            Arg::new("output_prefix")
                .long("output-prefix")
                .value_name("PREFIX")
                .help("Prefix for every output file name")
                .action(ArgAction::Set),
        )
        .add_bool_arg(
            "compress_output",
            "compress-output",
            "Write outputs gzip-compressed with a .gz suffix",
        )
    }

    fn add_bool_arg(self, id: &'static str, long: &'static str, help: &'static str) -> Self {
        self.arg(
            Arg::new(id)
                .long(long)
                .help(help)
                .action(ArgAction::SetTrue),
        )
    }
}

fn main() {
    let _ = env_logger::builder().try_init();

    log::info!(
        "bbcov-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = clap::Command::new("bbcov-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Correlates basic-block coverage divergence with run outcomes")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("CONFIG")
                .help("Path to a bbcov.toml file")
                .action(ArgAction::Set),
        )
        .subcommand(clap::Command::new("version").about("Prints the version of the driver"))
        .subcommand(
            clap::Command::new("gen-cov")
                .about("Writes <prefix>cover<n>-<pid> files into every run directory")
                .add_run_selection_args()
                .add_output_args(),
        )
        .subcommand(
            clap::Command::new("gen-cov-correlation")
                .about("Writes one <prefix>coverMerged<n> correlation file per snapshot")
                .add_run_selection_args()
                .add_output_args()
                .arg(
                    Arg::new("indicator")
                        .long("indicator")
                        .value_name("KIND")
                        .help("Correlation indicator")
                        .value_parser(["standard", "biased"])
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("run_cmp")
                        .long("run-cmp")
                        .value_name("PROGRAM")
                        .help("Resolve run status with `PROGRAM <refDir> <runDir>`")
                        .conflicts_with("run_eval")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("run_eval")
                        .long("run-eval")
                        .value_name("PROGRAM")
                        .help("Resolve run status with `PROGRAM <runDir>`")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("output_dir")
                        .long("output-dir")
                        .value_name("DIR")
                        .help("Directory receiving the merged covers (default: current directory)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("jobs")
                        .long("jobs")
                        .value_name("N")
                        .help("Threads parsing run logs ahead of the merge")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("summary_json")
                        .long("summary-json")
                        .value_name("PATH")
                        .help("Write a JSON summary of the merge to PATH")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            clap::Command::new("catalog")
                .about("Dumps a block-metadata log: index, corruption flag, locations")
                .arg(
                    Arg::new("bb_info_log")
                        .value_name("TRACE_BB_INFO_LOG")
                        .help("Block-metadata log (trace_bb_info.log-<PID>[.gz])")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    let mut toml_path: Option<String> = matches
        .get_one::<String>("config")
        .map(|s| s.to_string());

    // If there is no config flag specified, but there is a bbcov.toml in the
    // current directory, use that.
    if toml_path.is_none() {
        let cwd_toml_path = std::path::Path::new("bbcov.toml");
        if cwd_toml_path.exists() {
            log::info!("Using bbcov.toml in current directory");
            toml_path = Some(cwd_toml_path.display().to_string());
        }
    }

    let config: Option<AnalysisConfig> = toml_path.map(|path| {
        if !std::path::Path::new(&path).exists() {
            let cwd = std::env::current_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_default();
            report_cli_error_and_exit(
                "config toml file does not exist",
                None,
                vec![("path", path.as_str()), ("working directory", cwd.as_str())],
                1,
            );
        }
        let toml_str = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => report_cli_error_and_exit(
                "could not read config toml file",
                None,
                vec![("path", path.as_str()), ("error", e.to_string().as_str())],
                1,
            ),
        };
        match toml::from_str::<BbcovToml>(&toml_str) {
            Ok(parsed) => parsed.analysis,
            Err(e) => report_cli_error_and_exit(
                "could not parse config toml file",
                None,
                vec![("path", path.as_str()), ("error", e.to_string().as_str())],
                1,
            ),
        }
    });

    if let Some(matches) = matches.subcommand_matches("gen-cov") {
        gen_cov::handle_gen_cov(matches, &config);
    } else if let Some(matches) = matches.subcommand_matches("gen-cov-correlation") {
        gen_cov_correlation::handle_gen_cov_correlation(matches, &config);
    } else if let Some(matches) = matches.subcommand_matches("catalog") {
        catalog_dump::handle_catalog(matches);
    } else if let Some(_matches) = matches.subcommand_matches("version") {
        println!("{}", env!("CARGO_PKG_VERSION"));
    } else {
        report_cli_error_and_exit("No valid subcommand provided.", None, vec![], 1);
    }
}
