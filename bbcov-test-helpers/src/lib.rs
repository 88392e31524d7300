// SPDX-License-Identifier: Apache-2.0

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compare arbitrary text against a golden file on disk, with an opt-in
/// update mechanism controlled by the BBCOV_UPDATE_GOLDEN environment
/// variable. Uses full-string equality (no trimming) for exactness.
pub fn compare_golden_text(got: &str, relpath: &str) {
    let golden_path = Path::new(relpath);
    if std::env::var("BBCOV_UPDATE_GOLDEN").is_ok()
        || !golden_path.exists()
        || golden_path.metadata().map(|m| m.len()).unwrap_or(0) == 0
    {
        log::info!(
            "compare_golden_text; writing golden file to {}",
            golden_path.display()
        );
        if let Some(parent) = golden_path.parent() {
            std::fs::create_dir_all(parent).expect("create golden dir");
        }
        std::fs::write(golden_path, got).expect("write golden");
    } else {
        log::info!(
            "compare_golden_text; reading golden file from {}",
            golden_path.display()
        );
        let want = std::fs::read_to_string(golden_path).expect("read golden");
        assert_eq!(
            got, want,
            "Golden mismatch; run with BBCOV_UPDATE_GOLDEN=1 to update."
        );
    }
}

/// Creates a unique temporary directory for tests under the system temp dir,
/// using the provided base prefix combined with the process id and a nanosecond
/// timestamp.
///
/// The directory is cleaned up automatically when the returned `TempDir` is
/// dropped.
pub fn make_test_tmpdir(base_prefix: &str) -> tempfile::TempDir {
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let prefix = format!("{}_{}_{}", base_prefix, pid, nanos);
    tempfile::Builder::new()
        .prefix(&prefix)
        .tempdir_in(std::env::temp_dir())
        .expect("tempdir create")
}

/// Builder that lays out one run directory the way the instrumented program
/// leaves it: `trace_bb_info.log-<pid>`, `trace_bb_cov.log-<pid>` and
/// optionally a `dd.return.value` status file.
///
/// Metadata lines are written in declaration order, so declaring one index
/// twice with another index in between makes it look corrupted.
#[derive(Debug, Clone)]
pub struct RunFixture {
    dir: PathBuf,
    pid: u32,
    blocks: Vec<(u64, String, String, u32)>,
    snapshots: Vec<Vec<(u64, u64)>>,
    status: Option<String>,
    gzip: bool,
}

impl RunFixture {
    pub fn new(root: &Path, name: &str, pid: u32) -> Self {
        RunFixture {
            dir: root.join(name),
            pid,
            blocks: Vec::new(),
            snapshots: Vec::new(),
            status: None,
            gzip: false,
        }
    }

    /// Declares block `index` at `symbol` / `file:line`. May be repeated for
    /// the same index to give it several locations.
    pub fn block(mut self, index: u64, symbol: &str, file: &str, line: u32) -> Self {
        self.blocks
            .push((index, symbol.to_string(), file.to_string(), line));
        self
    }

    /// Appends a snapshot with the given `(index, count)` pairs.
    pub fn snapshot(mut self, counts: &[(u64, u64)]) -> Self {
        self.snapshots.push(counts.to_vec());
        self
    }

    /// Writes `code` to the status file.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.status = Some(format!("{}\n", code));
        self
    }

    /// Writes arbitrary text to the status file.
    pub fn raw_status(mut self, text: &str) -> Self {
        self.status = Some(text.to_string());
        self
    }

    /// Writes both logs gzip-compressed with a `.gz` suffix.
    pub fn gzip(mut self) -> Self {
        self.gzip = true;
        self
    }

    /// Creates the directory and files; returns the coverage log path as the
    /// driver expects it on its command line.
    pub fn write(self) -> PathBuf {
        std::fs::create_dir_all(&self.dir).expect("create run dir");

        let mut info = String::new();
        for (index, symbol, file, line) in &self.blocks {
            info.push_str(&format!("{} : {} : {} : {}\n", index, symbol, file, line));
        }
        let mut cov = String::new();
        for (n, counts) in self.snapshots.iter().enumerate() {
            cov.push_str(&format!("cover-{}\n", n));
            for (index, count) in counts {
                cov.push_str(&format!("{}:{}\n", index, count));
            }
        }

        self.write_log(&format!("trace_bb_info.log-{}", self.pid), &info);
        let cov_path = self.write_log(&format!("trace_bb_cov.log-{}", self.pid), &cov);
        if let Some(status) = &self.status {
            std::fs::write(self.dir.join("dd.return.value"), status).expect("write status");
        }
        cov_path
    }

    fn write_log(&self, name: &str, text: &str) -> PathBuf {
        if self.gzip {
            let path = self.dir.join(format!("{}.gz", name));
            let file = std::fs::File::create(&path).expect("create gz log");
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(text.as_bytes()).expect("write gz log");
            encoder.finish().expect("finish gz log");
            path
        } else {
            let path = self.dir.join(name);
            std::fs::write(&path, text).expect("write log");
            path
        }
    }
}

/// Writes an executable `/bin/sh` script, for standing in as a comparator or
/// evaluator.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod script");
    path
}
