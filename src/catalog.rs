// SPDX-License-Identifier: Apache-2.0

//! Per-run basic-block metadata (`trace_bb_info.log-<PID>`).
//!
//! Each line reads `<index> : <symbol> : <file> : <line>` and is emitted
//! every time the instrumented program executes the block, so the same index
//! normally repeats many times. Repeated observations are folded together;
//! an index whose repetitions are not back to back in the log is flagged as
//! corrupted (the log was truncated or interleaved).

use crate::error::{BbcovError, Result};
use crate::location::{compress_locations, compress_marks, Observation};
use crate::log_io::open_log;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+) : (.*) : (\S*) : ([0-9]+)").expect("block-metadata regex is valid")
});

/// Everything observed for one block index in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    observations: Vec<Observation>,
    corrupted: bool,
}

impl BlockRecord {
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    /// The symbol used for cross-run identity: the first one observed.
    pub fn canonical_symbol(&self) -> &str {
        &self.observations[0].symbol
    }

    /// Distinct symbols, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut syms: Vec<&str> = self
            .observations
            .iter()
            .map(|o| o.symbol.as_str())
            .collect();
        syms.sort_unstable();
        syms.dedup();
        syms
    }

    pub fn location_string(&self) -> String {
        compress_locations(&self.observations)
    }

    pub fn describe(&self) -> String {
        compress_marks(&self.observations)
    }

    pub fn touches_any_file(&self, files: &[String]) -> bool {
        self.observations
            .iter()
            .any(|o| files.iter().any(|f| *f == o.file))
    }
}

struct RecordBuilder {
    observations: Vec<Observation>,
    last_seen: usize,
    corrupted: bool,
}

#[derive(Debug, Default)]
pub struct BlockCatalog {
    records: BTreeMap<u64, BlockRecord>,
}

impl BlockCatalog {
    pub fn from_path(path: &Path) -> Result<BlockCatalog> {
        let source = open_log(path)?;
        Self::from_reader(source.reader, &source.path)
    }

    /// Parses a block-metadata stream; `origin` is only used in diagnostics.
    pub fn from_reader<R: BufRead>(reader: R, origin: &Path) -> Result<BlockCatalog> {
        let mut builders: BTreeMap<u64, RecordBuilder> = BTreeMap::new();
        for (counter, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| BbcovError::io(origin, e))?;
            let malformed = || BbcovError::MalformedCatalogLine {
                path: origin.to_path_buf(),
                lineno: counter + 1,
                line: line.clone(),
            };
            let caps = LINE_RE.captures(line.trim()).ok_or_else(malformed)?;
            let index: u64 = caps[1].parse().map_err(|_| malformed())?;
            let lineno: u32 = caps[4].parse().map_err(|_| malformed())?;
            let observation = Observation::new(&caps[2], &caps[3], lineno);

            match builders.get_mut(&index) {
                Some(b) => {
                    if !b.observations.contains(&observation) {
                        b.observations.push(observation);
                    }
                    if b.last_seen + 1 != counter {
                        b.corrupted = true;
                    }
                    b.last_seen = counter;
                }
                None => {
                    builders.insert(
                        index,
                        RecordBuilder {
                            observations: vec![observation],
                            last_seen: counter,
                            corrupted: false,
                        },
                    );
                }
            }
        }
        let records = builders
            .into_iter()
            .map(|(index, b)| {
                (
                    index,
                    BlockRecord {
                        observations: b.observations,
                        corrupted: b.corrupted,
                    },
                )
            })
            .collect();
        Ok(BlockCatalog { records })
    }

    pub fn get(&self, index: u64) -> Option<&BlockRecord> {
        self.records.get(&index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &BlockRecord)> {
        self.records.iter().map(|(i, r)| (*i, r))
    }

    /// All distinct symbols seen for `index`, or `None` for an unknown index.
    pub fn symbols(&self, index: u64) -> Option<Vec<&str>> {
        self.get(index).map(BlockRecord::symbols)
    }

    pub fn location_string(&self, index: u64) -> Option<String> {
        self.get(index).map(BlockRecord::location_string)
    }

    pub fn is_corrupted(&self, index: u64) -> Option<bool> {
        self.get(index).map(BlockRecord::is_corrupted)
    }
}
