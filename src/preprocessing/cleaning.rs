//! Очистка данных: импутация, физиологический фильтр, удаление выбросов

use crate::error::{PipelineError, Result};
use crate::preprocessing::statistics::{median, quantile};
use crate::types::{ProcessedRecord, RawRecord};

/// Допустимый физиологический диапазон глюкозы, mg/dL
pub const GLUCOSE_MIN: f64 = 40.0;
pub const GLUCOSE_MAX: f64 = 400.0;

/// Множитель IQR для границ выбросов
pub const IQR_FACTOR: f64 = 1.5;

type Column = (&'static str, fn(&ProcessedRecord) -> f64);

/// Колонки для удаления выбросов. Порядок важен: границы каждой колонки
/// считаются по данным, уже обрезанным предыдущими колонками.
pub const OUTLIER_COLUMNS: [Column; 4] = [
    ("ratio", |r| r.ratio),
    ("variability", |r| r.variability),
    ("slope", |r| r.slope),
    ("glucose", |r| r.glucose),
];

/// Медианы ratio, variability, slope по присутствующим значениям
pub fn column_medians(records: &[RawRecord]) -> Result<[f64; 3]> {
    let ratio: Vec<f64> = records.iter().filter_map(|r| r.ratio).collect();
    let variability: Vec<f64> = records.iter().filter_map(|r| r.variability).collect();
    let slope: Vec<f64> = records.iter().filter_map(|r| r.slope).collect();

    let median_of = |values: &[f64], column: &str| {
        median(values).ok_or_else(|| PipelineError::Imputation {
            column: column.to_string(),
        })
    };

    Ok([
        median_of(&ratio, "ratio")?,
        median_of(&variability, "variability")?,
        median_of(&slope, "slope")?,
    ])
}

/// Заполняет пропуски медианой колонки текущего набора
pub fn impute_missing(mut records: Vec<RawRecord>) -> Result<Vec<RawRecord>> {
    if records.is_empty() {
        return Ok(records);
    }

    let [ratio, variability, slope] = column_medians(&records)?;
    for record in &mut records {
        record.ratio.get_or_insert(ratio);
        record.variability.get_or_insert(variability);
        record.slope.get_or_insert(slope);
    }

    Ok(records)
}

/// Оставляет только записи с глюкозой в [40, 400]
pub fn filter_physiological(records: Vec<RawRecord>) -> Vec<RawRecord> {
    records
        .into_iter()
        .filter(|r| (GLUCOSE_MIN..=GLUCOSE_MAX).contains(&r.glucose))
        .collect()
}

/// Границы [Q1 - k*IQR, Q3 + k*IQR] для набора значений
pub fn iqr_bounds(values: &[f64], factor: f64) -> Option<(f64, f64)> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - factor * iqr, q3 + factor * iqr))
}

/// Последовательное IQR-удаление выбросов по `OUTLIER_COLUMNS`
pub fn remove_outliers(mut records: Vec<ProcessedRecord>) -> Vec<ProcessedRecord> {
    for (name, value_of) in OUTLIER_COLUMNS {
        let values: Vec<f64> = records.iter().map(value_of).collect();
        let Some((lower, upper)) = iqr_bounds(&values, IQR_FACTOR) else {
            return records;
        };

        let before = records.len();
        records.retain(|r| {
            let v = value_of(r);
            v >= lower && v <= upper
        });
        tracing::debug!(
            "Outlier filter on {}: [{:.4}, {:.4}], removed {} rows",
            name,
            lower,
            upper,
            before - records.len()
        );
    }

    records
}
