// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Exit status used when no run in the set resolves to success, so no
/// reference can be chosen. Kept distinct from generic failures so wrapper
/// scripts can tell "unusable dataset" apart from other errors.
pub const NO_REFERENCE_EXIT_CODE: i32 = 42;

#[derive(Debug)]
pub enum BbcovError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    MalformedCatalogLine {
        path: PathBuf,
        lineno: usize,
        line: String,
    },
    MalformedCoverageLine {
        path: PathBuf,
        lineno: usize,
        line: String,
    },
    UnknownBlock {
        dir: PathBuf,
        index: u64,
    },
    SnapshotCountMismatch {
        dir: PathBuf,
        got: usize,
        want: usize,
    },
    CounterInvariant {
        class: &'static str,
        total: u64,
        diff: u64,
        equal: u64,
    },
    MissingOutcomeClass {
        successes: usize,
        failures: usize,
    },
    NoSuccessfulRun,
    Config(String),
}

impl BbcovError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BbcovError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status the driver uses for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BbcovError::Config(_) => 1,
            BbcovError::Io { .. }
            | BbcovError::MalformedCatalogLine { .. }
            | BbcovError::MalformedCoverageLine { .. }
            | BbcovError::UnknownBlock { .. } => 2,
            BbcovError::SnapshotCountMismatch { .. } => 3,
            BbcovError::CounterInvariant { .. } => 4,
            BbcovError::MissingOutcomeClass { .. } => 5,
            BbcovError::NoSuccessfulRun => NO_REFERENCE_EXIT_CODE,
        }
    }
}

impl std::fmt::Display for BbcovError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BbcovError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            BbcovError::MalformedCatalogLine { path, lineno, line } => write!(
                f,
                "malformed block-metadata line {}:{}: {:?}",
                path.display(),
                lineno,
                line
            ),
            BbcovError::MalformedCoverageLine { path, lineno, line } => write!(
                f,
                "malformed coverage line {}:{}: {:?}",
                path.display(),
                lineno,
                line
            ),
            BbcovError::UnknownBlock { dir, index } => write!(
                f,
                "coverage log in {} references block index {} absent from its block-metadata log",
                dir.display(),
                index
            ),
            BbcovError::SnapshotCountMismatch { dir, got, want } => write!(
                f,
                "problem with the number of sync points: {} has {} snapshots, reference has {}",
                dir.display(),
                got,
                want
            ),
            BbcovError::CounterInvariant {
                class,
                total,
                diff,
                equal,
            } => write!(
                f,
                "contingency counter invariant violated for {} runs: diff {} + equal {} != total {}",
                class, diff, equal, total
            ),
            BbcovError::MissingOutcomeClass {
                successes,
                failures,
            } => write!(
                f,
                "correlation needs both successful and failing runs; got {} successes and {} failures",
                successes, failures
            ),
            BbcovError::NoSuccessfulRun => {
                write!(f, "no run resolves to success; no usable reference")
            }
            BbcovError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for BbcovError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BbcovError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BbcovError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_dataset_errors() {
        let codes = [
            BbcovError::SnapshotCountMismatch {
                dir: PathBuf::from("r"),
                got: 1,
                want: 2,
            }
            .exit_code(),
            BbcovError::CounterInvariant {
                class: "fail",
                total: 1,
                diff: 0,
                equal: 0,
            }
            .exit_code(),
            BbcovError::MissingOutcomeClass {
                successes: 3,
                failures: 0,
            }
            .exit_code(),
            BbcovError::NoSuccessfulRun.exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(BbcovError::NoSuccessfulRun.exit_code(), 42);
    }
}
