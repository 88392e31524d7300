// SPDX-License-Identifier: Apache-2.0

//! Drives a correlation merge over a whole set of runs: resolves and caches
//! every run's status, picks the reference, and streams the other runs
//! through a [`CorrelationMerger`] in input order.

use crate::config::AnalysisConfig;
use crate::error::{BbcovError, Result};
use crate::merge::CorrelationMerger;
use crate::run::{RunData, RunDescriptor};
use crate::status::{Outcome, StatusSource};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeProgress {
    /// Input position of the run just folded.
    pub position: usize,
    pub runs: usize,
    /// Share of the non-reference runs merged so far, in percent.
    pub percent: f64,
}

pub trait ProgressSink {
    fn on_progress(&mut self, p: MergeProgress);
}

/// Positions at which progress is reported when folding `runs` runs.
pub fn progress_milestones(runs: usize) -> BTreeSet<usize> {
    let mut milestones: BTreeSet<usize> = (0..100)
        .step_by(10)
        .chain([1, 5])
        .map(|p| p * runs / 100)
        .collect();
    milestones.insert(1);
    milestones.insert(runs.saturating_sub(1));
    milestones
}

fn progress_at(position: usize, reference: usize, runs: usize) -> MergeProgress {
    let merged = if position < reference {
        position + 1
    } else {
        position
    };
    let denominator = runs.saturating_sub(1).max(1);
    MergeProgress {
        position,
        runs,
        percent: 100.0 * merged as f64 / denominator as f64,
    }
}

/// A run whose status resolved to success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRun {
    pub run: RunDescriptor,
    pub outcome: Outcome,
}

pub struct RunSetOrchestrator {
    runs: Vec<ResolvedRun>,
    discarded: Vec<RunDescriptor>,
    preferred_reference: String,
    config: AnalysisConfig,
}

impl RunSetOrchestrator {
    /// Resolves every run's status exactly once. Runs whose status is
    /// unknown are set aside and reported by [`Self::discarded`].
    pub fn new(
        runs: Vec<RunDescriptor>,
        status: &dyn StatusSource,
        config: AnalysisConfig,
    ) -> RunSetOrchestrator {
        let mut resolved = Vec::with_capacity(runs.len());
        let mut discarded = Vec::new();
        for run in runs {
            match status.resolve(&run).outcome() {
                Some(outcome) => resolved.push(ResolvedRun { run, outcome }),
                None => {
                    log::warn!("directory ignored : {}", run.dir.display());
                    discarded.push(run);
                }
            }
        }
        RunSetOrchestrator {
            runs: resolved,
            discarded,
            preferred_reference: status.preferred_reference_substring().to_string(),
            config,
        }
    }

    pub fn runs(&self) -> &[ResolvedRun] {
        &self.runs
    }

    pub fn discarded(&self) -> &[RunDescriptor] {
        &self.discarded
    }

    /// `(successes, failures)` among the resolved runs, reference included.
    pub fn outcome_counts(&self) -> (usize, usize) {
        let successes = self
            .runs
            .iter()
            .filter(|r| r.outcome == Outcome::Success)
            .count();
        (successes, self.runs.len() - successes)
    }

    /// Index into [`Self::runs`] of the reference: a successful run whose
    /// directory ends with the reference marker and mentions the preferred
    /// substring; else a successful run ending with the marker; else the
    /// first successful run.
    pub fn select_reference(&self) -> Result<usize> {
        let marker = self.config.reference_marker.as_str();
        let is_success = |r: &ResolvedRun| r.outcome == Outcome::Success;
        let marked = |r: &ResolvedRun| r.run.dir_text().ends_with(marker);

        if let Some(i) = self.runs.iter().position(|r| {
            is_success(r) && marked(r) && r.run.dir_text().contains(&self.preferred_reference)
        }) {
            return Ok(i);
        }
        log::info!(
            "no successful reference matching {:?}",
            self.preferred_reference
        );
        if let Some(i) = self.runs.iter().position(|r| is_success(r) && marked(r)) {
            return Ok(i);
        }
        log::warn!(
            "no successful run ending with {:?}; switching to first success reference selection",
            marker
        );
        self.runs
            .iter()
            .position(is_success)
            .ok_or(BbcovError::NoSuccessfulRun)
    }

    /// Merges every run into a fresh merger seeded from the reference.
    pub fn merge(&self, mut progress: Option<&mut dyn ProgressSink>) -> Result<CorrelationMerger> {
        let reference = self.select_reference()?;
        let (successes, failures) = self.outcome_counts();
        log::info!("NbSuccess: {} \t nbFail {}", successes, failures);
        if successes == 0 || failures == 0 {
            return Err(BbcovError::MissingOutcomeClass {
                successes,
                failures,
            });
        }

        let reference_data = RunData::load(&self.runs[reference].run)?;
        let mut merger =
            CorrelationMerger::seed_from_reference(&reference_data, self.config.block_filter())?;
        drop(reference_data);

        let milestones = progress_milestones(self.runs.len());
        let others: Vec<(usize, RunDescriptor)> = self
            .runs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != reference)
            .map(|(i, r)| (i, r.run.clone()))
            .collect();
        let positions: Vec<usize> = others.iter().map(|(i, _)| *i).collect();
        let descriptors: Vec<RunDescriptor> = others.into_iter().map(|(_, r)| r).collect();

        read_ahead(&descriptors, self.config.jobs, |k, data| {
            let position = positions[k];
            merger.fold(&data, self.runs[position].outcome)?;
            if milestones.contains(&position) {
                if let Some(sink) = progress.as_deref_mut() {
                    sink.on_progress(progress_at(position, reference, self.runs.len()));
                }
            }
            Ok(())
        })?;
        Ok(merger)
    }
}

struct Loaded {
    index: usize,
    result: Result<RunData>,
}

/// Parses `runs` on up to `jobs` worker threads and hands each one to
/// `consume` in input order. At most `jobs` parsed runs are in flight at any
/// time so memory stays bounded however far workers get ahead.
pub fn read_ahead<F>(runs: &[RunDescriptor], jobs: usize, mut consume: F) -> Result<()>
where
    F: FnMut(usize, RunData) -> Result<()>,
{
    let worker_count = jobs.min(runs.len());
    if worker_count <= 1 {
        for (i, run) in runs.iter().enumerate() {
            consume(i, RunData::load(run)?)?;
        }
        return Ok(());
    }

    let (job_tx, job_rx) = mpsc::channel::<(usize, RunDescriptor)>();
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (tx, rx) = mpsc::channel::<Loaded>();

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let job_rx = Arc::clone(&job_rx);
        let tx = tx.clone();
        handles.push(thread::spawn(move || loop {
            let next_job = match job_rx.lock() {
                Ok(jobs) => jobs.recv(),
                Err(_) => break,
            };
            let Ok((index, run)) = next_job else {
                break;
            };
            let result = RunData::load(&run);
            if tx.send(Loaded { index, result }).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut queued = 0usize;
    let mut job_tx = Some(job_tx);
    let enqueue = |job_tx: &mut Option<mpsc::Sender<(usize, RunDescriptor)>>,
                   queued: &mut usize| {
        if *queued < runs.len() {
            if let Some(sender) = job_tx.as_ref() {
                let _ = sender.send((*queued, runs[*queued].clone()));
            }
            *queued += 1;
        }
        // Workers exit once the queue is drained and the sender is gone.
        if *queued == runs.len() {
            job_tx.take();
        }
    };
    for _ in 0..worker_count {
        enqueue(&mut job_tx, &mut queued);
    }

    let mut pending = BTreeMap::<usize, Result<RunData>>::new();
    let mut next_to_emit = 0usize;
    let mut outcome = Ok(());
    'emit: while next_to_emit < runs.len() {
        let Ok(loaded) = rx.recv() else {
            break;
        };
        pending.insert(loaded.index, loaded.result);
        while let Some(ready) = pending.remove(&next_to_emit) {
            if let Err(e) = ready.and_then(|data| consume(next_to_emit, data)) {
                outcome = Err(e);
                break 'emit;
            }
            next_to_emit += 1;
            enqueue(&mut job_tx, &mut queued);
        }
    }

    job_tx.take();
    drop(rx);
    for handle in handles {
        if let Err(panic) = handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
    outcome
}
