// SPDX-License-Identifier: Apache-2.0

use bbcov::BbcovError;
use colored::Colorize;

pub fn report_cli_error_and_exit(
    message: &str,
    subcommand: Option<&str>,
    details: Vec<(&str, &str)>,
    exit_code: i32,
) -> ! {
    let subcommand_str = if let Some(subcommand) = subcommand {
        format!("{}: ", subcommand)
    } else {
        String::new()
    };
    eprintln!("bbcov-driver: {}{}", subcommand_str, message.red().bold());
    for (key, value) in details {
        eprintln!("  {}: {}", key, value);
    }
    std::process::exit(exit_code);
}

/// Reports `err` and exits with the status its root cause calls for; errors
/// that do not come from the analysis library exit with 1.
pub fn report_anyhow_error_and_exit(err: &anyhow::Error, subcommand: &str) -> ! {
    let exit_code = err
        .downcast_ref::<BbcovError>()
        .map(BbcovError::exit_code)
        .unwrap_or(1);
    let chain: Vec<String> = err.chain().skip(1).map(|e| e.to_string()).collect();
    let caused_by = chain.join("; ");
    let mut details = vec![("exit code", exit_code.to_string())];
    if !caused_by.is_empty() {
        details.push(("caused by", caused_by));
    }
    report_cli_error_and_exit(
        &err.to_string(),
        Some(subcommand),
        details.iter().map(|(k, v)| (*k, v.as_str())).collect(),
        exit_code,
    )
}
