// SPDX-License-Identifier: Apache-2.0

//! Success/failure classification of a single run.

use crate::launcher::run_and_capture;
use crate::run::RunDescriptor;
use std::path::{Path, PathBuf};

pub const DEFAULT_STATUS_FILE: &str = "dd.return.value";
pub const DEFAULT_REFERENCE_MARKER: &str = "ref";

/// Directory-name fragments used to pick the comparator's reference
/// directory before any status is known.
pub const COMPARATOR_ANCHOR_PATTERNS: [&str; 4] = ["ref", "Ref", "nearest", "Nearest"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Success,
    Failure,
    Unknown,
}

impl RunStatus {
    pub fn from_exit_ok(ok: bool) -> RunStatus {
        if ok {
            RunStatus::Success
        } else {
            RunStatus::Failure
        }
    }

    /// The outcome to fold, or `None` when the run must be left out.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            RunStatus::Success => Some(Outcome::Success),
            RunStatus::Failure => Some(Outcome::Failure),
            RunStatus::Unknown => None,
        }
    }
}

/// A resolved status; only these runs take part in correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
}

/// Seam between the orchestrator and whatever decides run outcomes.
pub trait StatusSource {
    fn resolve(&self, run: &RunDescriptor) -> RunStatus;

    /// Substring that marks the most preferred reference directory.
    fn preferred_reference_substring(&self) -> &str;
}

/// The three mutually exclusive ways of resolving a run's status.
#[derive(Debug, Clone)]
pub enum StatusPolicy {
    /// Reads an integer from `<runDir>/<file_name>`; 0 is success.
    ExitCodeFile {
        file_name: String,
        reference_marker: String,
    },
    /// Runs `program <reference_dir> <runDir>`.
    Comparator {
        program: PathBuf,
        reference_dir: PathBuf,
    },
    /// Runs `program <runDir>`.
    Evaluator { program: PathBuf },
}

impl StatusPolicy {
    pub fn exit_code_file() -> StatusPolicy {
        StatusPolicy::ExitCodeFile {
            file_name: DEFAULT_STATUS_FILE.to_string(),
            reference_marker: DEFAULT_REFERENCE_MARKER.to_string(),
        }
    }

    fn read_exit_code_file(
        run: &RunDescriptor,
        file_name: &str,
        reference_marker: &str,
    ) -> RunStatus {
        let path = run.dir.join(file_name);
        if !path.exists() {
            if run.dir_text().ends_with(reference_marker) {
                log::info!("{}: no {}; considering reference a success", run, file_name);
                return RunStatus::Success;
            }
            return RunStatus::Unknown;
        }
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("error while reading {}: {}", path.display(), e);
                return RunStatus::Unknown;
            }
        };
        let first = text.lines().next().unwrap_or("").trim();
        match first.parse::<i64>() {
            Ok(value) => RunStatus::from_exit_ok(value == 0),
            Err(_) => {
                log::warn!(
                    "error while reading {}: {:?} is not an integer",
                    path.display(),
                    first
                );
                RunStatus::Unknown
            }
        }
    }

    fn run_collaborator(
        run: &RunDescriptor,
        program: &Path,
        args: &[&PathBuf],
        tag: &str,
    ) -> RunStatus {
        let capture = run.dir.join(format!("{}{}", tag, run.pid));
        match run_and_capture(program, args, &capture) {
            Ok(ok) => RunStatus::from_exit_ok(ok),
            Err(e) => {
                log::warn!("{}: could not run {}: {}", run, program.display(), e);
                RunStatus::Unknown
            }
        }
    }
}

impl StatusSource for StatusPolicy {
    fn resolve(&self, run: &RunDescriptor) -> RunStatus {
        match self {
            StatusPolicy::ExitCodeFile {
                file_name,
                reference_marker,
            } => Self::read_exit_code_file(run, file_name, reference_marker),
            StatusPolicy::Comparator {
                program,
                reference_dir,
            } => Self::run_collaborator(run, program, &[reference_dir, &run.dir], "cmpCmd"),
            StatusPolicy::Evaluator { program } => {
                Self::run_collaborator(run, program, &[&run.dir], "evalCmd")
            }
        }
    }

    fn preferred_reference_substring(&self) -> &str {
        match self {
            StatusPolicy::ExitCodeFile { .. } => "dd.line/ref",
            StatusPolicy::Comparator { .. } | StatusPolicy::Evaluator { .. } => "Nearest",
        }
    }
}

/// Name-only choice of the directory every run is compared against: the
/// first run whose directory mentions one of [`COMPARATOR_ANCHOR_PATTERNS`],
/// else the first run.
pub fn pick_comparator_anchor(runs: &[RunDescriptor]) -> Option<&RunDescriptor> {
    runs.iter()
        .find(|run| {
            let dir = run.dir_text();
            COMPARATOR_ANCHOR_PATTERNS.iter().any(|p| dir.contains(p))
        })
        .or_else(|| runs.first())
}
