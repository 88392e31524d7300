// SPDX-License-Identifier: Apache-2.0

//! Correlates basic-block coverage divergence with run outcomes.
//!
//! Each execution of an instrumented program leaves a block-metadata log and
//! a coverage-counter log in its run directory, plus some way of telling
//! whether the run succeeded. Blocks are matched across runs by their
//! canonical source location, and every non-reference run is folded into a
//! per-block contingency table that yields a correlation indicator.
//!
//! The typical flow is:
//!
//! ```no_run
//! use bbcov::{AnalysisConfig, RunDescriptor, RunSetOrchestrator, StatusPolicy};
//!
//! # fn main() -> bbcov::Result<()> {
//! let runs = vec![
//!     RunDescriptor::new(100, "dd.line/ref"),
//!     RunDescriptor::new(101, "dd.line/run1"),
//!     RunDescriptor::new(102, "dd.line/run2"),
//! ];
//! let config = AnalysisConfig::default();
//! let policy = StatusPolicy::exit_code_file();
//! let orchestrator = RunSetOrchestrator::new(runs, &policy, config.clone());
//! let merger = orchestrator.merge(None)?;
//! let out_dir = std::path::Path::new(".");
//! bbcov::report::write_merged_covers(&merger, out_dir, "", config.indicator, false)?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod launcher;
pub mod location;
pub mod log_io;
pub mod merge;
pub mod report;
pub mod run;
pub mod run_set;
pub mod status;
pub mod trace;

pub use catalog::{BlockCatalog, BlockRecord};
pub use config::AnalysisConfig;
pub use error::{BbcovError, Result};
pub use merge::{CanonicalKey, ContingencyCounter, CorrelationMerger, IndicatorKind};
pub use run::{RunData, RunDescriptor};
pub use run_set::{MergeProgress, ProgressSink, RunSetOrchestrator};
pub use status::{Outcome, RunStatus, StatusPolicy, StatusSource};
pub use trace::CoverageTrace;
