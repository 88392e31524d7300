// SPDX-License-Identifier: Apache-2.0

//! Per-run hit counters (`trace_bb_cov.log-<PID>`).
//!
//! The log is a sequence of `cover-<N>` sentinels, each opening snapshot `N`,
//! followed by `<index>:<count>` lines.

use crate::error::{BbcovError, Result};
use crate::log_io::open_log;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

const SENTINEL_PREFIX: &str = "cover-";

/// Hit counts gathered between two sync points, keyed by block index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub seq: usize,
    pub counts: BTreeMap<u64, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTrace {
    snapshots: Vec<Snapshot>,
}

impl CoverageTrace {
    pub fn from_path(path: &Path) -> Result<CoverageTrace> {
        let source = open_log(path)?;
        Self::from_reader(source.reader, &source.path)
    }

    pub fn from_reader<R: BufRead>(reader: R, origin: &Path) -> Result<CoverageTrace> {
        let mut snapshots: Vec<Snapshot> = Vec::new();
        let mut current: Option<Snapshot> = None;
        let mut ignored_preamble = 0usize;

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| BbcovError::io(origin, e))?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let malformed = || BbcovError::MalformedCoverageLine {
                path: origin.to_path_buf(),
                lineno: i + 1,
                line: line.clone(),
            };

            if let Some(number) = text.strip_prefix(SENTINEL_PREFIX) {
                let expected = current.as_ref().map(|s| s.seq + 1).unwrap_or(0);
                let number: usize = number.parse().map_err(|_| malformed())?;
                if number != expected {
                    return Err(malformed());
                }
                if let Some(done) = current.take() {
                    snapshots.push(done);
                }
                current = Some(Snapshot {
                    seq: number,
                    counts: BTreeMap::new(),
                });
                continue;
            }

            let (index, count) = text.split_once(':').ok_or_else(malformed)?;
            let index: u64 = index.trim().parse().map_err(|_| malformed())?;
            let count: u64 = count.trim().parse().map_err(|_| malformed())?;
            match current.as_mut() {
                Some(snapshot) => {
                    snapshot.counts.insert(index, count);
                }
                None => ignored_preamble += 1,
            }
        }
        if let Some(done) = current.take() {
            snapshots.push(done);
        }
        if ignored_preamble > 0 {
            log::warn!(
                "{}: ignored {} counter line(s) before the first {}0 sentinel",
                origin.display(),
                ignored_preamble,
                SENTINEL_PREFIX
            );
        }
        Ok(CoverageTrace { snapshots })
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<CoverageTrace> {
        CoverageTrace::from_reader(text.as_bytes(), Path::new("trace_bb_cov.log-1"))
    }

    #[test]
    fn test_snapshots_in_order_with_final_flush() {
        let trace = parse("cover-0\n1:5\n2:0\ncover-1\n1:7\n").unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.snapshots()[0].seq, 0);
        assert_eq!(
            trace.snapshots()[0].counts,
            BTreeMap::from([(1, 5), (2, 0)])
        );
        assert_eq!(trace.snapshots()[1].counts, BTreeMap::from([(1, 7)]));
    }

    #[test]
    fn test_empty_snapshot_is_kept() {
        let trace = parse("cover-0\ncover-1\n4:1\n").unwrap();
        assert_eq!(trace.len(), 2);
        assert!(trace.snapshots()[0].counts.is_empty());
    }

    #[test]
    fn test_no_sentinel_means_no_snapshots() {
        let trace = parse("1:2\n").unwrap();
        assert!(trace.is_empty());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_repeated_index_keeps_last_count() {
        let trace = parse("cover-0\n3:1\n3:9\n").unwrap();
        assert_eq!(trace.snapshots()[0].counts, BTreeMap::from([(3, 9)]));
    }

    #[test]
    fn test_out_of_sequence_sentinel_is_fatal() {
        let err = parse("cover-0\n1:1\ncover-2\n").unwrap_err();
        assert!(matches!(
            err,
            BbcovError::MalformedCoverageLine { lineno: 3, .. }
        ));
    }

    #[test]
    fn test_bad_counter_line_is_fatal() {
        for text in ["cover-0\n1:x\n", "cover-0\nxyz\n", "cover-0\n:4\n"] {
            let err = parse(text).unwrap_err();
            assert!(
                matches!(err, BbcovError::MalformedCoverageLine { lineno: 2, .. }),
                "text {:?} gave {}",
                text,
                err
            );
        }
    }
}
