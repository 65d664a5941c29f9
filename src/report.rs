/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Portable snapshot of a driver's convergence history.
//!
//! A [`ConvergenceReport`] flattens the append-only log of an
//! [`AdaptiveConvergence`] into plain records that serialise cleanly.
//! Distances keep their tag (`"Incomparable"` or `{"Finite": d}`), and
//! non-finite floats are written as `"NaN"`, `"inf"` or `"-inf"`, so a report
//! from a divergent run reads back exactly.
//!
//! ```rust,ignore
//! use emergence_core::report::ConvergenceReport;
//!
//! let report = ConvergenceReport::from_driver(&driver);
//! let json = serde_json::to_string(&report).unwrap();
//! let restored: ConvergenceReport = serde_json::from_str(&json).unwrap();
//! ```
//!
//! This module requires the `serde` feature.

use crate::convergence::{AdaptiveConvergence, ConvergenceConfig, ConvergenceRecord, RunId};
use crate::observable::{Distance, Observable};

/// Current report format version.
pub const REPORT_VERSION: u16 = 1;

/// Serialisable history of one driver.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct ConvergenceReport {
    /// Format version; [`REPORT_VERSION`] for new reports.
    pub version: u16,
    /// Configuration the driver ran with.
    pub config: ConvergenceConfig,
    /// Runs started on the driver.
    pub runs: u32,
    /// Every record, oldest first.
    pub records: Vec<RecordEntry>,
}

/// One compared iteration.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct RecordEntry {
    /// Run that produced this record.
    pub run_id: RunId,
    /// Index of the `compute` call within its run.
    pub iteration: usize,
    /// Problem size.
    pub size: usize,
    /// Distance to the previous result.
    pub distance: Distance,
    /// Result at this size.
    pub result: Observable,
}

impl From<&ConvergenceRecord> for RecordEntry {
    fn from(r: &ConvergenceRecord) -> Self {
        Self {
            run_id: r.run_id,
            iteration: r.iteration,
            size: r.size,
            distance: r.distance,
            result: r.result.clone(),
        }
    }
}

impl ConvergenceReport {
    /// Snapshot the full history of `driver`.
    pub fn from_driver(driver: &AdaptiveConvergence) -> Self {
        Self {
            version: REPORT_VERSION,
            config: driver.config().clone(),
            runs: driver.runs(),
            records: driver.history().iter().map(RecordEntry::from).collect(),
        }
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Records of one run, in order.
    pub fn find_run(&self, run_id: RunId) -> Vec<&RecordEntry> {
        self.records.iter().filter(|r| r.run_id == run_id).collect()
    }
}
