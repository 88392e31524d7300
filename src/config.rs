// SPDX-License-Identifier: Apache-2.0

use crate::error::{BbcovError, Result};
use crate::merge::{BlockFilter, IndicatorKind};
use crate::status::{StatusPolicy, DEFAULT_REFERENCE_MARKER, DEFAULT_STATUS_FILE};
use serde::Deserialize;

/// Knobs of one analysis session. Every field may be omitted from the
/// `[analysis]` table of a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Worker threads used to parse run logs ahead of the fold. The fold
    /// itself is always sequential.
    pub jobs: usize,

    pub indicator: IndicatorKind,

    /// Directory-name suffix identifying reference runs.
    pub reference_marker: String,

    /// Name of the per-run file holding the analysed program's exit code.
    pub status_file: String,

    /// Source files whose blocks are left out of the analysis.
    pub ignore_files: Vec<String>,

    /// Leave out blocks whose metadata log looked truncated or interleaved.
    pub exclude_corrupted: bool,

    /// Prepended to every output file name.
    pub output_prefix: String,

    /// Write outputs gzip-compressed with a `.gz` suffix.
    pub compress_output: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            jobs: num_cpus::get(),
            indicator: IndicatorKind::Biased,
            reference_marker: DEFAULT_REFERENCE_MARKER.to_string(),
            status_file: DEFAULT_STATUS_FILE.to_string(),
            ignore_files: Vec::new(),
            exclude_corrupted: false,
            output_prefix: String::new(),
            compress_output: false,
        }
    }
}

impl AnalysisConfig {
    pub fn block_filter(&self) -> BlockFilter {
        BlockFilter {
            ignore_files: self.ignore_files.clone(),
            exclude_corrupted: self.exclude_corrupted,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(BbcovError::Config("jobs must be at least 1".to_string()));
        }
        if self.reference_marker.is_empty() {
            return Err(BbcovError::Config(
                "reference_marker must not be empty".to_string(),
            ));
        }
        if self.status_file.is_empty() || self.status_file.contains('/') {
            return Err(BbcovError::Config(format!(
                "status_file must be a plain file name, got {:?}",
                self.status_file
            )));
        }
        Ok(())
    }

    /// The exit-code-file policy with this session's file name and marker.
    pub fn exit_code_policy(&self) -> StatusPolicy {
        StatusPolicy::ExitCodeFile {
            file_name: self.status_file.clone(),
            reference_marker: self.reference_marker.clone(),
        }
    }
}
