// SPDX-License-Identifier: Apache-2.0

//! Runs external comparison/evaluation collaborators and reports only
//! whether they exited cleanly. Their stdout/stderr go to `<prefix>.out` and
//! `<prefix>.err`; nothing in them is parsed.

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// Runs `program args...` to completion. Returns `Ok(true)` when the process
/// exits with status 0, `Ok(false)` on any other exit (including death by
/// signal), and `Err` if it could not be started or the capture files could
/// not be created.
pub fn run_and_capture<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    capture_prefix: &Path,
) -> std::io::Result<bool> {
    let stdout = File::create(with_suffix(capture_prefix, ".out"))?;
    let stderr = File::create(with_suffix(capture_prefix, ".err"))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    log::debug!("Running command: {:?}", command);

    let status = command.status()?;
    if !status.success() {
        log::info!("{} exited with status: {}", program.display(), status);
    }
    Ok(status.success())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_and_capture() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("evalCmd7");
        let ok = run_and_capture(Path::new("/bin/sh"), &["-c", "echo hi; exit 0"], &prefix)
            .unwrap();
        assert!(ok);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("evalCmd7.out")).unwrap(),
            "hi\n"
        );
        let ok = run_and_capture(Path::new("/bin/sh"), &["-c", "echo no >&2; exit 3"], &prefix)
            .unwrap();
        assert!(!ok);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("evalCmd7.err")).unwrap(),
            "no\n"
        );
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("cmpCmd1");
        let args: [&str; 0] = [];
        assert!(run_and_capture(Path::new("/definitely/not/here"), &args, &prefix).is_err());
    }
}
