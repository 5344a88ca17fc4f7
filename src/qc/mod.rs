//! Quality control for observation series.
//!
//! The checks themselves run over the array-of-structs series; this module
//! also provides the `DataFrame` surface used by callers that work with the
//! frames returned by the acquisition engine:
//!
//! ```no_run
//! use agromet::qc::{apply_quality_control, get_qc_report};
//! use agromet::VariableCategory;
//! # fn demo(raw: polars::prelude::DataFrame) -> Result<(), agromet::AgrometError> {
//! let flagged = apply_quality_control(&raw, VariableCategory::Temperature)?;
//! let report = get_qc_report(&flagged)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod checks;
pub mod report;

pub use checks::{ExtremeMethod, QcConfig, QcFlag, QcVerdict, QualityControl};
pub use report::QcReport;

use crate::error::AgrometError;
use crate::types::observation::ObservationSeries;
use crate::types::variable::VariableCategory;
use log::info;
use polars::prelude::*;

/// Runs the full check pipeline (default configuration) over a raw frame
/// with `tiempo`/`valor` columns, returning the frame with one boolean
/// `qc_<flag>` column per flag plus `qc_passed`.
pub fn apply_quality_control(
    df: &DataFrame,
    category: VariableCategory,
) -> Result<DataFrame, AgrometError> {
    apply_quality_control_with(df, category, &QualityControl::default())
}

/// [`apply_quality_control`] with an explicit pipeline configuration.
pub fn apply_quality_control_with(
    df: &DataFrame,
    category: VariableCategory,
    qc: &QualityControl,
) -> Result<DataFrame, AgrometError> {
    let series = ObservationSeries::from_data_frame(df)?;
    let verdicts = qc.apply_all_checks(&series, category);

    let mut columns = series.to_data_frame()?.get_columns().to_vec();
    for flag in QcFlag::ALL {
        let values: Vec<bool> = verdicts.iter().map(|v| v.is_flagged(flag)).collect();
        columns.push(Column::new(flag.column_name().into(), values));
    }
    let passed: Vec<bool> = verdicts.iter().map(QcVerdict::passed).collect();
    columns.push(Column::new("qc_passed".into(), passed));

    let report = QcReport::from_verdicts(&verdicts);
    info!(
        "QC summary ({category}): {}/{} passed ({} flagged)",
        report.passed, report.total, report.failed
    );
    Ok(DataFrame::new(columns)?)
}

/// Summarizes a flagged frame produced by [`apply_quality_control`].
pub fn get_qc_report(df: &DataFrame) -> Result<QcReport, AgrometError> {
    let height = df.height();
    let mut verdicts = vec![QcVerdict::default(); height];
    for flag in QcFlag::ALL {
        let column = df.column(&flag.column_name())?.bool()?;
        for (i, value) in column.into_iter().enumerate() {
            if value.unwrap_or(false) {
                match flag {
                    QcFlag::ExtremeValue => verdicts[i].extreme_value = true,
                    QcFlag::StuckSensor => verdicts[i].stuck_sensor = true,
                    QcFlag::SuddenChange => verdicts[i].sudden_change = true,
                    QcFlag::SuspiciousZero => verdicts[i].suspicious_zero = true,
                    QcFlag::Missing => verdicts[i].missing = true,
                }
            }
        }
    }
    Ok(QcReport::from_verdicts(&verdicts))
}

/// Internal consistency over an aggregated temperature frame: flags rows
/// violating `valor_min <= valor_mean <= valor_max` in a boolean
/// `qc_temp_consistency` column (`true` = inconsistent).
pub fn check_internal_consistency_temperature(df: &DataFrame) -> Result<DataFrame, AgrometError> {
    let min = df.column("valor_min")?.f64()?;
    let mean = df.column("valor_mean")?.f64()?;
    let max = df.column("valor_max")?.f64()?;

    let mut inconsistent = Vec::with_capacity(df.height());
    for ((lo, mid), hi) in min.into_iter().zip(mean.into_iter()).zip(max.into_iter()) {
        let verdict = match (lo, mid, hi) {
            (Some(lo), Some(mid), Some(hi)) => !(lo <= mid && mid <= hi),
            _ => false,
        };
        inconsistent.push(verdict);
    }

    let mut columns = df.get_columns().to_vec();
    columns.push(Column::new("qc_temp_consistency".into(), inconsistent));
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::Observation;
    use chrono::NaiveDate;

    fn raw_frame(values: &[Option<f64>]) -> DataFrame {
        let base = NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ObservationSeries::from_observations(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    Observation::new(base + chrono::Duration::minutes(15 * i as i64), *v)
                })
                .collect(),
        )
        .to_data_frame()
        .unwrap()
    }

    #[test]
    fn frame_surface_round_trips_flags() {
        let mut values: Vec<Option<f64>> = (0..12).map(|i| Some(10.0 + i as f64)).collect();
        values[4] = Some(200.0);
        values[7] = None;
        let df = raw_frame(&values);

        let flagged = apply_quality_control(&df, VariableCategory::Temperature).unwrap();
        assert_eq!(flagged.height(), 12);
        for flag in QcFlag::ALL {
            assert!(flagged.column(&flag.column_name()).is_ok());
        }

        let report = get_qc_report(&flagged).unwrap();
        assert_eq!(report.total, 12);
        assert_eq!(report.failed_by_flag[&QcFlag::ExtremeValue], 1);
        assert_eq!(report.failed_by_flag[&QcFlag::Missing], 1);
        // 200 is both extreme and a sudden jump; the reading after it jumps
        // back down again.
        assert!(report.failed_by_flag[&QcFlag::SuddenChange] >= 2);
        assert!(report.passed < report.total);
    }

    #[test]
    fn temperature_consistency_flags_inverted_rows() {
        let tiempo = Column::new("tiempo".into(), vec![0i64, 1])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![
            tiempo,
            Column::new("valor_mean".into(), vec![15.0, 10.0]),
            Column::new("valor_min".into(), vec![10.0, 12.0]),
            Column::new("valor_max".into(), vec![20.0, 11.0]),
        ])
        .unwrap();

        let checked = check_internal_consistency_temperature(&df).unwrap();
        let flags = checked.column("qc_temp_consistency").unwrap().bool().unwrap();
        assert_eq!(flags.get(0), Some(false));
        assert_eq!(flags.get(1), Some(true));
    }
}
