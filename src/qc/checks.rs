//! The quality-control checks.
//!
//! Four independent checks run over a single-variable series; a row can
//! accumulate several flags and passes only when none fired. Checks never
//! fail on malformed data: an unparsable reading is flagged `missing` and
//! excluded from every other comparison, so the next valid reading compares
//! against the last valid one, not the hole.

use crate::types::observation::ObservationSeries;
use crate::types::variable::VariableCategory;
use std::fmt;

/// The fixed flag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QcFlag {
    ExtremeValue,
    StuckSensor,
    SuddenChange,
    SuspiciousZero,
    Missing,
}

impl QcFlag {
    pub const ALL: [QcFlag; 5] = [
        QcFlag::ExtremeValue,
        QcFlag::StuckSensor,
        QcFlag::SuddenChange,
        QcFlag::SuspiciousZero,
        QcFlag::Missing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QcFlag::ExtremeValue => "extreme_value",
            QcFlag::StuckSensor => "stuck_sensor",
            QcFlag::SuddenChange => "sudden_change",
            QcFlag::SuspiciousZero => "suspicious_zero",
            QcFlag::Missing => "missing",
        }
    }

    /// Name of the boolean column carrying this flag in a flagged frame.
    pub fn column_name(&self) -> String {
        format!("qc_{}", self.as_str())
    }
}

impl fmt::Display for QcFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-row verdict: which checks flagged the reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QcVerdict {
    pub extreme_value: bool,
    pub stuck_sensor: bool,
    pub sudden_change: bool,
    pub suspicious_zero: bool,
    pub missing: bool,
}

impl QcVerdict {
    /// A row passes iff no flag fired.
    pub fn passed(&self) -> bool {
        !(self.extreme_value
            || self.stuck_sensor
            || self.sudden_change
            || self.suspicious_zero
            || self.missing)
    }

    pub fn is_flagged(&self, flag: QcFlag) -> bool {
        match flag {
            QcFlag::ExtremeValue => self.extreme_value,
            QcFlag::StuckSensor => self.stuck_sensor,
            QcFlag::SuddenChange => self.sudden_change,
            QcFlag::SuspiciousZero => self.suspicious_zero,
            QcFlag::Missing => self.missing,
        }
    }

    fn set(&mut self, flag: QcFlag) {
        match flag {
            QcFlag::ExtremeValue => self.extreme_value = true,
            QcFlag::StuckSensor => self.stuck_sensor = true,
            QcFlag::SuddenChange => self.sudden_change = true,
            QcFlag::SuspiciousZero => self.suspicious_zero = true,
            QcFlag::Missing => self.missing = true,
        }
    }
}

/// How the extreme value check derives its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtremeMethod {
    /// Category-specific physically plausible range.
    #[default]
    FixedBound,
    /// Interquartile fences `Q1 - k*IQR` / `Q3 + k*IQR`, tightened to the
    /// physical range. Falls back to the fixed bounds silently when the
    /// series holds fewer than 4 valid points.
    Iqr,
}

/// Tunables for the check pipeline.
///
/// Per-category zero-plausibility is deliberately configuration: only wind is
/// flagged by default, other categories opt in via `zero_flag_categories`.
#[derive(Debug, Clone)]
pub struct QcConfig {
    pub extreme_method: ExtremeMethod,
    pub iqr_multiplier: f64,
    pub stuck_tolerance: f64,
    pub stuck_window: usize,
    pub zero_run_window: usize,
    /// Overrides the category's sudden-change threshold when set.
    pub max_change: Option<f64>,
    /// Categories for which a sustained exact-zero run is implausible.
    pub zero_flag_categories: Vec<VariableCategory>,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            extreme_method: ExtremeMethod::FixedBound,
            iqr_multiplier: 3.0,
            stuck_tolerance: 0.1,
            stuck_window: 10,
            zero_run_window: 10,
            max_change: None,
            zero_flag_categories: vec![VariableCategory::Wind],
        }
    }
}

/// The check pipeline.
#[derive(Debug, Clone, Default)]
pub struct QualityControl {
    config: QcConfig,
}

impl QualityControl {
    pub fn new(config: QcConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    /// Runs all four checks, returning one verdict per observation.
    pub fn apply_all_checks(
        &self,
        series: &ObservationSeries,
        category: VariableCategory,
    ) -> Vec<QcVerdict> {
        let mut verdicts = vec![QcVerdict::default(); series.len()];

        // Valid readings with their row index; everything else is missing.
        let mut valid: Vec<(usize, f64)> = Vec::with_capacity(series.len());
        for (i, obs) in series.iter().enumerate() {
            match obs.value {
                Some(v) if !v.is_nan() => valid.push((i, v)),
                _ => verdicts[i].missing = true,
            }
        }

        self.check_extreme(&valid, category, &mut verdicts);
        self.check_stuck(&valid, &mut verdicts);
        self.check_sudden(&valid, category, &mut verdicts);
        self.check_zero_runs(&valid, category, &mut verdicts);
        verdicts
    }

    fn check_extreme(
        &self,
        valid: &[(usize, f64)],
        category: VariableCategory,
        verdicts: &mut [QcVerdict],
    ) {
        let (phys_lo, phys_hi) = category.physical_range();
        let (lo, hi) = match self.config.extreme_method {
            ExtremeMethod::FixedBound => (phys_lo, phys_hi),
            ExtremeMethod::Iqr if valid.len() < 4 => (phys_lo, phys_hi),
            ExtremeMethod::Iqr => {
                let mut values: Vec<f64> = valid.iter().map(|&(_, v)| v).collect();
                values.sort_by(|a, b| a.total_cmp(b));
                let q1 = quantile(&values, 0.25);
                let q3 = quantile(&values, 0.75);
                let iqr = q3 - q1;
                let k = self.config.iqr_multiplier;
                // The fences can only tighten the physical range, never
                // widen it: physically impossible readings stay flagged.
                ((q1 - k * iqr).max(phys_lo), (q3 + k * iqr).min(phys_hi))
            }
        };
        for &(i, v) in valid {
            if v < lo || v > hi {
                verdicts[i].set(QcFlag::ExtremeValue);
            }
        }
    }

    fn check_stuck(&self, valid: &[(usize, f64)], verdicts: &mut [QcVerdict]) {
        self.flag_runs(
            valid,
            self.config.stuck_window,
            QcFlag::StuckSensor,
            |prev, current| (current - prev).abs() <= self.config.stuck_tolerance,
            verdicts,
        );
    }

    fn check_sudden(
        &self,
        valid: &[(usize, f64)],
        category: VariableCategory,
        verdicts: &mut [QcVerdict],
    ) {
        let max_change = self
            .config
            .max_change
            .unwrap_or_else(|| category.default_max_change());
        for pair in valid.windows(2) {
            let (_, prev) = pair[0];
            let (i, current) = pair[1];
            if (current - prev).abs() > max_change {
                verdicts[i].set(QcFlag::SuddenChange);
            }
        }
    }

    fn check_zero_runs(
        &self,
        valid: &[(usize, f64)],
        category: VariableCategory,
        verdicts: &mut [QcVerdict],
    ) {
        if !self.config.zero_flag_categories.contains(&category) {
            return;
        }
        self.flag_runs(
            valid,
            self.config.zero_run_window,
            QcFlag::SuspiciousZero,
            |prev, current| prev == 0.0 && current == 0.0,
            verdicts,
        );
    }

    /// Flags every member of each maximal run of at least `window`
    /// consecutive valid readings where `in_run(prev, current)` holds for
    /// each adjacent pair.
    fn flag_runs(
        &self,
        valid: &[(usize, f64)],
        window: usize,
        flag: QcFlag,
        in_run: impl Fn(f64, f64) -> bool,
        verdicts: &mut [QcVerdict],
    ) {
        if window == 0 || valid.len() < window {
            return;
        }
        let mut run_start = 0;
        for pos in 1..=valid.len() {
            let broke =
                pos == valid.len() || !in_run(valid[pos - 1].1, valid[pos].1);
            if broke {
                if pos - run_start >= window {
                    for &(i, _) in &valid[run_start..pos] {
                        verdicts[i].set(flag);
                    }
                }
                run_start = pos;
            }
        }
    }
}

/// Linear-interpolation quantile over sorted values (the convention pandas
/// uses by default). `values` must be non-empty and sorted.
fn quantile(values: &[f64], q: f64) -> f64 {
    let position = (values.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let fraction = position - lower as f64;
    if lower + 1 < values.len() {
        values[lower] + fraction * (values[lower + 1] - values[lower])
    } else {
        values[lower]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::Observation;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(15 * i as i64)
    }

    fn series(values: &[Option<f64>]) -> ObservationSeries {
        ObservationSeries::from_observations(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Observation::new(ts(i), *v))
                .collect(),
        )
    }

    fn flagged(verdicts: &[QcVerdict], flag: QcFlag) -> Vec<usize> {
        verdicts
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_flagged(flag))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn stuck_run_of_fifteen_flags_all_fifteen() {
        let qc = QualityControl::default();
        let verdicts =
            qc.apply_all_checks(&series(&[Some(15.0); 15]), VariableCategory::Temperature);
        assert_eq!(flagged(&verdicts, QcFlag::StuckSensor).len(), 15);
    }

    #[test]
    fn stuck_run_of_nine_flags_none() {
        let qc = QualityControl::default();
        let verdicts =
            qc.apply_all_checks(&series(&[Some(15.0); 9]), VariableCategory::Temperature);
        assert!(flagged(&verdicts, QcFlag::StuckSensor).is_empty());
    }

    #[test]
    fn stuck_tolerates_drift_within_tolerance() {
        // Pairwise differences of 0.05 stay under the 0.1 tolerance.
        let values: Vec<Option<f64>> = (0..12).map(|i| Some(15.0 + 0.05 * i as f64)).collect();
        let qc = QualityControl::default();
        let verdicts = qc.apply_all_checks(&series(&values), VariableCategory::Temperature);
        assert_eq!(flagged(&verdicts, QcFlag::StuckSensor).len(), 12);
    }

    #[test]
    fn extreme_temperature_is_flagged_by_both_methods() {
        let mut values: Vec<Option<f64>> = (0..20).map(|i| Some(12.0 + (i % 5) as f64)).collect();
        values.push(Some(200.0));
        let s = series(&values);

        let fixed = QualityControl::default();
        let verdicts = fixed.apply_all_checks(&s, VariableCategory::Temperature);
        assert_eq!(flagged(&verdicts, QcFlag::ExtremeValue), vec![20]);

        let iqr = QualityControl::new(QcConfig {
            extreme_method: ExtremeMethod::Iqr,
            ..QcConfig::default()
        });
        let verdicts = iqr.apply_all_checks(&s, VariableCategory::Temperature);
        assert!(flagged(&verdicts, QcFlag::ExtremeValue).contains(&20));
    }

    #[test]
    fn iqr_falls_back_to_fixed_bounds_on_short_series() {
        let qc = QualityControl::new(QcConfig {
            extreme_method: ExtremeMethod::Iqr,
            ..QcConfig::default()
        });
        // Three points: IQR is not computable; only the physical range
        // applies, so 59 passes and 200 is flagged.
        let verdicts = qc.apply_all_checks(
            &series(&[Some(10.0), Some(59.0), Some(200.0)]),
            VariableCategory::Temperature,
        );
        assert_eq!(flagged(&verdicts, QcFlag::ExtremeValue), vec![2]);
    }

    #[test]
    fn sudden_jump_flags_the_second_reading_only() {
        let qc = QualityControl::default();
        let verdicts = qc.apply_all_checks(
            &series(&[Some(10.0), Some(35.0), Some(34.0)]),
            VariableCategory::Temperature,
        );
        assert_eq!(flagged(&verdicts, QcFlag::SuddenChange), vec![1]);
    }

    #[test]
    fn first_reading_is_never_a_sudden_change() {
        let qc = QualityControl::default();
        let verdicts = qc.apply_all_checks(
            &series(&[Some(100.0), Some(101.0)]),
            VariableCategory::Temperature,
        );
        assert!(flagged(&verdicts, QcFlag::SuddenChange).is_empty());
    }

    #[test]
    fn sudden_change_skips_missing_readings() {
        // The 35.0 compares against 10.0, the last valid reading, not the
        // missing row in between.
        let qc = QualityControl::default();
        let verdicts = qc.apply_all_checks(
            &series(&[Some(10.0), None, Some(35.0)]),
            VariableCategory::Temperature,
        );
        assert_eq!(flagged(&verdicts, QcFlag::Missing), vec![1]);
        assert_eq!(flagged(&verdicts, QcFlag::SuddenChange), vec![2]);
    }

    #[test]
    fn nan_counts_as_missing() {
        let qc = QualityControl::default();
        let verdicts = qc.apply_all_checks(
            &series(&[Some(10.0), Some(f64::NAN), Some(11.0)]),
            VariableCategory::Temperature,
        );
        assert_eq!(flagged(&verdicts, QcFlag::Missing), vec![1]);
        assert!(verdicts[0].passed() && verdicts[2].passed());
    }

    #[test]
    fn zero_runs_are_suspicious_for_wind_only() {
        let zeros = [Some(0.0); 12];
        let qc = QualityControl::default();

        let wind = qc.apply_all_checks(&series(&zeros), VariableCategory::Wind);
        assert_eq!(flagged(&wind, QcFlag::SuspiciousZero).len(), 12);
        // A long zero run is also a persistence failure.
        assert_eq!(flagged(&wind, QcFlag::StuckSensor).len(), 12);

        let precip = qc.apply_all_checks(&series(&zeros), VariableCategory::Precipitation);
        assert!(flagged(&precip, QcFlag::SuspiciousZero).is_empty());
    }

    #[test]
    fn short_zero_runs_pass() {
        let qc = QualityControl::default();
        let verdicts = qc.apply_all_checks(&series(&[Some(0.0); 9]), VariableCategory::Wind);
        assert!(flagged(&verdicts, QcFlag::SuspiciousZero).is_empty());
    }

    #[test]
    fn rows_accumulate_multiple_flags() {
        let mut values = vec![Some(15.0); 10];
        values.push(Some(200.0));
        let qc = QualityControl::default();
        let verdicts = qc.apply_all_checks(&series(&values), VariableCategory::Temperature);
        let last = verdicts.last().unwrap();
        assert!(last.extreme_value);
        assert!(last.sudden_change);
        assert!(!last.passed());
        assert!(verdicts[0].stuck_sensor);
    }

    #[test]
    fn empty_series_yields_no_verdicts() {
        let qc = QualityControl::default();
        assert!(qc
            .apply_all_checks(&ObservationSeries::empty(), VariableCategory::Temperature)
            .is_empty());
    }

    #[test]
    fn quantiles_interpolate() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.25), 1.75);
        assert_eq!(quantile(&values, 0.75), 3.25);
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
    }
}
