// SPDX-License-Identifier: Apache-2.0

//! Output artifacts: per-run covers in plain mode and one merged cover per
//! snapshot in correlation mode.

use crate::catalog::BlockCatalog;
use crate::error::{BbcovError, Result};
use crate::log_io::LogSink;
use crate::merge::{BlockFilter, CorrelationMerger, GlobalCounters, IndicatorKind};
use crate::run::RunData;
use crate::trace::Snapshot;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// `<count>\t: <location>` for every admitted block of `snapshot`, ordered
/// by (sorted symbols, location, index).
pub fn plain_cover_lines(
    snapshot: &Snapshot,
    catalog: &BlockCatalog,
    filter: &BlockFilter,
    dir: &Path,
) -> Result<Vec<String>> {
    let mut rows = Vec::with_capacity(snapshot.counts.len());
    for (&index, &count) in &snapshot.counts {
        let record = catalog
            .get(index)
            .ok_or_else(|| BbcovError::UnknownBlock {
                dir: dir.to_path_buf(),
                index,
            })?;
        if !filter.admits(record) {
            continue;
        }
        rows.push((record.symbols(), record.location_string(), index, count));
    }
    rows.sort();
    Ok(rows
        .into_iter()
        .map(|(_, location, _, count)| format!("{}\t: {}", count, location))
        .collect())
}

/// Writes `<runDir>/<prefix>cover<n>-<pid>` for every snapshot of `data`.
pub fn write_plain_covers(
    data: &RunData,
    filter: &BlockFilter,
    prefix: &str,
    compress: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(data.trace.len());
    for (n, snapshot) in data.trace.snapshots().iter().enumerate() {
        let lines = plain_cover_lines(snapshot, &data.catalog, filter, &data.run.dir)?;
        let path = data
            .run
            .dir
            .join(format!("{}cover{}-{}", prefix, n, data.run.pid));
        let mut sink = LogSink::create(&path, compress)?;
        for line in &lines {
            sink.write_line(line)?;
        }
        written.push(sink.finish()?);
    }
    Ok(written)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub snapshot: usize,
    pub keys: usize,
    /// Keys whose indicator is undefined.
    pub undefined: usize,
    /// Largest defined indicator; 0 when there is none.
    pub max_indicator: f64,
    pub path: Option<PathBuf>,
}

/// Whole-session summary, serialized by `--summary-json`.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationSummary {
    pub reference: PathBuf,
    pub indicator: IndicatorKind,
    pub merged: GlobalCounters,
    pub discarded: Vec<PathBuf>,
    pub snapshots: Vec<SnapshotSummary>,
}

/// `<indicator>\t: <location>` lines for one merged snapshot, in key order,
/// with `none` standing for an undefined indicator.
pub fn merged_cover_lines(
    merger: &CorrelationMerger,
    snapshot: usize,
    kind: IndicatorKind,
) -> Result<(Vec<String>, SnapshotSummary)> {
    let mut summary = SnapshotSummary {
        snapshot,
        keys: 0,
        undefined: 0,
        max_indicator: 0.0,
        path: None,
    };
    let mut lines = Vec::new();
    let Some(merged) = merger.snapshot(snapshot) else {
        return Ok((lines, summary));
    };
    for (key, entry) in merged {
        summary.keys += 1;
        match merger.indicator(&entry.counter, kind)? {
            Some(value) => {
                summary.max_indicator = summary.max_indicator.max(value);
                lines.push(format!("{:.2}\t: {}", value, key.location));
            }
            None => {
                log::debug!("undefined indicator for {:?}: {:?}", key, entry);
                summary.undefined += 1;
                lines.push(format!("none\t: {}", key.location));
            }
        }
    }
    Ok((lines, summary))
}

/// Writes `<out_dir>/<prefix>coverMerged<n>` for every snapshot.
pub fn write_merged_covers(
    merger: &CorrelationMerger,
    out_dir: &Path,
    prefix: &str,
    kind: IndicatorKind,
    compress: bool,
) -> Result<Vec<SnapshotSummary>> {
    let mut summaries = Vec::with_capacity(merger.snapshot_count());
    for n in 0..merger.snapshot_count() {
        let (lines, mut summary) = merged_cover_lines(merger, n, kind)?;
        let path = out_dir.join(format!("{}coverMerged{}", prefix, n));
        let mut sink = LogSink::create(&path, compress)?;
        for line in &lines {
            sink.write_line(line)?;
        }
        summary.path = Some(sink.finish()?);
        summaries.push(summary);
    }
    Ok(summaries)
}
