//! Summary reporting over flagged series.

use crate::qc::checks::{QcFlag, QcVerdict};
use std::collections::BTreeMap;
use std::fmt;

/// Aggregated outcome of a QC run. Derived data: recomputed on demand, never
/// authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct QcReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub failed_by_flag: BTreeMap<QcFlag, usize>,
    /// Fraction of rows that passed; 1.0 for an empty series.
    pub pass_rate: f64,
}

impl QcReport {
    pub fn from_verdicts(verdicts: &[QcVerdict]) -> Self {
        let total = verdicts.len();
        let passed = verdicts.iter().filter(|v| v.passed()).count();
        let failed_by_flag = QcFlag::ALL
            .iter()
            .map(|&flag| {
                (
                    flag,
                    verdicts.iter().filter(|v| v.is_flagged(flag)).count(),
                )
            })
            .collect();
        Self {
            total,
            passed,
            failed: total - passed,
            failed_by_flag,
            pass_rate: if total == 0 {
                1.0
            } else {
                passed as f64 / total as f64
            },
        }
    }
}

impl fmt::Display for QcReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "QC report: {}/{} passed ({:.1}%)",
            self.passed,
            self.total,
            self.pass_rate * 100.0
        )?;
        for flag in QcFlag::ALL {
            writeln!(
                f,
                "  {:<16} {:>7}",
                format!("{flag}:"),
                self.failed_by_flag.get(&flag).copied().unwrap_or(0)
            )?;
        }
        Ok(())
    }
}
