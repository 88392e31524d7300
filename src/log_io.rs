// SPDX-License-Identifier: Apache-2.0

//! Line-oriented log input and report output, handling plain and `.gz`
//! files transparently.

use crate::error::{BbcovError, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

fn is_gz(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

fn with_gz_suffix(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".gz");
    PathBuf::from(s)
}

/// Picks the on-disk file for a logical log name: the name itself, or the
/// name with a `.gz` suffix when only the compressed form exists.
pub fn resolve_log_path(path: &Path) -> PathBuf {
    if path.exists() || is_gz(path) {
        return path.to_path_buf();
    }
    let gz = with_gz_suffix(path);
    if gz.exists() {
        gz
    } else {
        path.to_path_buf()
    }
}

/// An opened log along with the path actually read.
pub struct LogSource {
    pub path: PathBuf,
    pub reader: Box<dyn BufRead>,
}

pub fn open_log(path: &Path) -> Result<LogSource> {
    let actual = resolve_log_path(path);
    let file = File::open(&actual).map_err(|e| BbcovError::io(&actual, e))?;
    let reader: Box<dyn BufRead> = if is_gz(&actual) {
        Box::new(BufReader::with_capacity(
            256 * 1024,
            MultiGzDecoder::new(BufReader::new(file)),
        ))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };
    log::debug!("open_log; reading {}", actual.display());
    Ok(LogSource {
        path: actual,
        reader,
    })
}

/// Output file for report records. Must be closed with [`LogSink::finish`]
/// so the gzip trailer gets written and errors surface.
pub struct LogSink {
    path: PathBuf,
    inner: SinkInner,
}

enum SinkInner {
    Plain(BufWriter<File>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl LogSink {
    /// Creates `path` (or `path.gz` when `compress` is set).
    pub fn create(path: &Path, compress: bool) -> Result<LogSink> {
        let actual = if compress && !is_gz(path) {
            with_gz_suffix(path)
        } else {
            path.to_path_buf()
        };
        let file = File::create(&actual).map_err(|e| BbcovError::io(&actual, e))?;
        let writer = BufWriter::new(file);
        let inner = if compress || is_gz(&actual) {
            SinkInner::Gz(GzEncoder::new(writer, Compression::default()))
        } else {
            SinkInner::Plain(writer)
        };
        Ok(LogSink {
            path: actual,
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let w: &mut dyn Write = match &mut self.inner {
            SinkInner::Plain(w) => w,
            SinkInner::Gz(w) => w,
        };
        w.write_all(line.as_bytes())
            .and_then(|_| w.write_all(b"\n"))
            .map_err(|e| BbcovError::io(&self.path, e))
    }

    pub fn finish(self) -> Result<PathBuf> {
        let path = self.path;
        let result = match self.inner {
            SinkInner::Plain(mut w) => w.flush(),
            SinkInner::Gz(w) => w.finish().and_then(|mut inner| inner.flush()),
        };
        result.map_err(|e| BbcovError::io(&path, e))?;
        Ok(path)
    }
}
