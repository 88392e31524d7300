// SPDX-License-Identifier: Apache-2.0

//! Identification of one execution's on-disk artifacts.

use crate::catalog::BlockCatalog;
use crate::error::Result;
use crate::trace::CoverageTrace;
use std::path::{Path, PathBuf};

pub const COVERAGE_LOG_PREFIX: &str = "trace_bb_cov.log-";
pub const INFO_LOG_PREFIX: &str = "trace_bb_info.log-";

/// `(pid, directory)` of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunDescriptor {
    pub pid: u32,
    pub dir: PathBuf,
}

impl RunDescriptor {
    pub fn new(pid: u32, dir: impl Into<PathBuf>) -> Self {
        RunDescriptor {
            pid,
            dir: dir.into(),
        }
    }

    /// Derives the run from a path of the form
    /// `<dir>/trace_bb_cov.log-<PID>[.gz]`; `None` for any other name.
    pub fn from_coverage_path(path: &Path) -> Option<RunDescriptor> {
        let name = path.file_name()?.to_str()?;
        let rest = name.strip_prefix(COVERAGE_LOG_PREFIX)?;
        let pid_text = rest.strip_suffix(".gz").unwrap_or(rest);
        let pid: u32 = pid_text.parse().ok()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Some(RunDescriptor { pid, dir })
    }

    /// Logical path of the coverage-counter log; may exist only as `.gz`.
    pub fn coverage_log(&self) -> PathBuf {
        self.dir.join(format!("{}{}", COVERAGE_LOG_PREFIX, self.pid))
    }

    /// Logical path of the block-metadata log; may exist only as `.gz`.
    pub fn info_log(&self) -> PathBuf {
        self.dir.join(format!("{}{}", INFO_LOG_PREFIX, self.pid))
    }

    /// The directory as text, which is what name-based reference matching
    /// looks at.
    pub fn dir_text(&self) -> String {
        self.dir.to_string_lossy().into_owned()
    }
}

impl std::fmt::Display for RunDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (pid {})", self.dir.display(), self.pid)
    }
}

/// Both parsed logs of one run. Held only while the run is being reported
/// or folded.
#[derive(Debug)]
pub struct RunData {
    pub run: RunDescriptor,
    pub catalog: BlockCatalog,
    pub trace: CoverageTrace,
}

impl RunData {
    pub fn load(run: &RunDescriptor) -> Result<RunData> {
        log::debug!("loading run {}", run);
        let catalog = BlockCatalog::from_path(&run.info_log())?;
        let trace = CoverageTrace::from_path(&run.coverage_log())?;
        Ok(RunData {
            run: run.clone(),
            catalog,
            trace,
        })
    }
}

/// Recursively finds coverage logs (`trace_bb_cov.log*`) under `root`,
/// sorted, keeping at most `limit` of them when given.
pub fn discover_coverage_logs(
    root: &Path,
    limit: Option<usize>,
) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let ty = entry.file_type()?;
            if ty.is_dir() {
                stack.push(path);
                continue;
            }
            let is_cov = entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with("trace_bb_cov.log"))
                .unwrap_or(false);
            if is_cov && (ty.is_file() || path.is_file()) {
                found.push(path);
            }
        }
    }
    found.sort();
    if let Some(limit) = limit {
        found.truncate(limit);
    }
    Ok(found)
}
