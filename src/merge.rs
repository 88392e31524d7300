// SPDX-License-Identifier: Apache-2.0

//! Streaming correlation of coverage divergence with run outcomes.
//!
//! A [`CorrelationMerger`] is seeded with the reference run's hit counts and
//! then folds in one run at a time. For every canonical block and snapshot it
//! keeps a 2x2 contingency table over (outcome, coverage equal to the
//! reference or not). Folded runs are not retained, so memory stays
//! proportional to the number of distinct blocks times snapshots.
//!
//! Folds must be applied one after another: classifying a run reads the
//! per-key state left behind by the previous fold.

use crate::catalog::{BlockCatalog, BlockRecord};
use crate::error::{BbcovError, Result};
use crate::run::RunData;
use crate::status::Outcome;
use crate::trace::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Identity of a logical block across runs: its first symbol and the
/// canonical location string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey {
    pub symbol: String,
    pub location: String,
}

impl CanonicalKey {
    pub fn of(record: &BlockRecord) -> CanonicalKey {
        CanonicalKey {
            symbol: record.canonical_symbol().to_string(),
            location: record.location_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContingencyCounter {
    pub fail_diff: u64,
    pub fail_equal: u64,
    pub success_diff: u64,
    pub success_equal: u64,
}

impl ContingencyCounter {
    /// Counter for a key first met after some runs were merged. Those runs
    /// did not hit it, and a missing block counts as diff.
    fn late_seed(globals: &GlobalCounters) -> ContingencyCounter {
        ContingencyCounter {
            fail_diff: globals.fail,
            fail_equal: 0,
            success_diff: globals.success,
            success_equal: 0,
        }
    }

    #[must_use]
    pub fn observe(self, equal: bool, outcome: Outcome) -> ContingencyCounter {
        let mut next = self;
        match (outcome, equal) {
            (Outcome::Success, true) => next.success_equal += 1,
            (Outcome::Success, false) => next.success_diff += 1,
            (Outcome::Failure, true) => next.fail_equal += 1,
            (Outcome::Failure, false) => next.fail_diff += 1,
        }
        next
    }
}

/// Number of successful and failing runs merged so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalCounters {
    pub success: u64,
    pub fail: u64,
}

/// Reference hit count plus contingency counts for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergedEntry {
    pub reference_count: u64,
    pub counter: ContingencyCounter,
}

/// Per-key state of one snapshot, ordered by key.
pub type MergedSnapshot = BTreeMap<CanonicalKey, MergedEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// `(failDiff + successEqual) / (success + fail)`.
    Standard,
    /// `0.5 * (failDiff / fail + successEqual / success)`, which weighs both
    /// classes equally whatever their sizes.
    Biased,
}

impl std::str::FromStr for IndicatorKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "biased" => Ok(Self::Biased),
            _ => Err(format!("invalid indicator kind: {}", s)),
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorKind::Standard => write!(f, "standard"),
            IndicatorKind::Biased => write!(f, "biased"),
        }
    }
}

/// Opt-in exclusion of blocks from the analysis. The default admits every
/// block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockFilter {
    pub ignore_files: Vec<String>,
    pub exclude_corrupted: bool,
}

impl BlockFilter {
    pub fn admits(&self, record: &BlockRecord) -> bool {
        if self.exclude_corrupted && record.is_corrupted() {
            return false;
        }
        !record.touches_any_file(&self.ignore_files)
    }
}

/// Sums a snapshot's raw per-index counts into per-key totals.
pub fn collapse_snapshot(
    snapshot: &Snapshot,
    catalog: &BlockCatalog,
    filter: &BlockFilter,
    dir: &Path,
) -> Result<BTreeMap<CanonicalKey, u64>> {
    let mut totals: BTreeMap<CanonicalKey, u64> = BTreeMap::new();
    for (&index, &count) in &snapshot.counts {
        let record = catalog.get(index).ok_or_else(|| BbcovError::UnknownBlock {
            dir: dir.to_path_buf(),
            index,
        })?;
        if !filter.admits(record) {
            continue;
        }
        *totals.entry(CanonicalKey::of(record)).or_insert(0) += count;
    }
    Ok(totals)
}

#[derive(Debug)]
pub struct CorrelationMerger {
    reference_dir: PathBuf,
    filter: BlockFilter,
    globals: GlobalCounters,
    merged: Vec<MergedSnapshot>,
}

impl CorrelationMerger {
    /// Starts a merge from the reference run. The reference contributes hit
    /// counts only; it is never counted as an observation itself.
    pub fn seed_from_reference(reference: &RunData, filter: BlockFilter) -> Result<Self> {
        log::info!("covMerged with reference: {}", reference.run.dir.display());
        let mut merged = Vec::with_capacity(reference.trace.len());
        for snapshot in reference.trace.snapshots() {
            let totals =
                collapse_snapshot(snapshot, &reference.catalog, &filter, &reference.run.dir)?;
            merged.push(
                totals
                    .into_iter()
                    .map(|(key, count)| {
                        (
                            key,
                            MergedEntry {
                                reference_count: count,
                                counter: ContingencyCounter::default(),
                            },
                        )
                    })
                    .collect(),
            );
        }
        Ok(CorrelationMerger {
            reference_dir: reference.run.dir.clone(),
            filter,
            globals: GlobalCounters::default(),
            merged,
        })
    }

    /// Folds one non-reference run into the counters.
    pub fn fold(&mut self, run: &RunData, outcome: Outcome) -> Result<()> {
        if run.trace.len() != self.merged.len() {
            return Err(BbcovError::SnapshotCountMismatch {
                dir: run.run.dir.clone(),
                got: run.trace.len(),
                want: self.merged.len(),
            });
        }
        // Collapse every snapshot before touching any state so a bad run
        // leaves the merger unchanged.
        let mut collapsed = Vec::with_capacity(self.merged.len());
        for snapshot in run.trace.snapshots() {
            collapsed.push(collapse_snapshot(
                snapshot,
                &run.catalog,
                &self.filter,
                &run.run.dir,
            )?);
        }

        for (merged, totals) in self.merged.iter_mut().zip(collapsed) {
            for (key, count) in &totals {
                match merged.get_mut(key) {
                    Some(entry) => {
                        let equal = entry.reference_count == *count;
                        entry.counter = entry.counter.observe(equal, outcome);
                    }
                    None => {
                        let counter =
                            ContingencyCounter::late_seed(&self.globals).observe(false, outcome);
                        merged.insert(
                            key.clone(),
                            MergedEntry {
                                reference_count: 0,
                                counter,
                            },
                        );
                    }
                }
            }
            for (key, entry) in merged.iter_mut() {
                if !totals.contains_key(key) {
                    entry.counter = entry.counter.observe(false, outcome);
                }
            }
        }

        match outcome {
            Outcome::Success => self.globals.success += 1,
            Outcome::Failure => self.globals.fail += 1,
        }
        Ok(())
    }

    /// Correlation indicator for `counter` against the runs merged so far.
    ///
    /// Returns `Ok(None)` when either class is still empty (the indicator is
    /// undefined) and an error when the counter does not add up to the
    /// global totals, which means the merge itself is broken.
    pub fn indicator(&self, counter: &ContingencyCounter, kind: IndicatorKind) -> Result<Option<f64>> {
        let GlobalCounters { success, fail } = self.globals;
        if counter.fail_diff + counter.fail_equal != fail {
            return Err(BbcovError::CounterInvariant {
                class: "fail",
                total: fail,
                diff: counter.fail_diff,
                equal: counter.fail_equal,
            });
        }
        if counter.success_diff + counter.success_equal != success {
            return Err(BbcovError::CounterInvariant {
                class: "success",
                total: success,
                diff: counter.success_diff,
                equal: counter.success_equal,
            });
        }
        if success == 0 || fail == 0 {
            return Ok(None);
        }
        let value = match kind {
            IndicatorKind::Standard => {
                (counter.fail_diff + counter.success_equal) as f64 / (success + fail) as f64
            }
            IndicatorKind::Biased => {
                0.5 * (counter.fail_diff as f64 / fail as f64
                    + counter.success_equal as f64 / success as f64)
            }
        };
        Ok(Some(value))
    }

    /// Indicator for `key` in snapshot `snapshot`; `Ok(None)` also when the
    /// key was never seen there.
    pub fn indicator_for(
        &self,
        snapshot: usize,
        key: &CanonicalKey,
        kind: IndicatorKind,
    ) -> Result<Option<f64>> {
        match self.merged.get(snapshot).and_then(|m| m.get(key)) {
            Some(entry) => self.indicator(&entry.counter, kind),
            None => Ok(None),
        }
    }

    pub fn globals(&self) -> GlobalCounters {
        self.globals
    }

    pub fn snapshot_count(&self) -> usize {
        self.merged.len()
    }

    pub fn snapshot(&self, index: usize) -> Option<&MergedSnapshot> {
        self.merged.get(index)
    }

    pub fn reference_dir(&self) -> &Path {
        &self.reference_dir
    }
}
