//! Производные признаки PPG-сигнала и сборка матрицы признаков

use ndarray::{Array1, Array2};

use crate::error::{PipelineError, Result};
use crate::types::{ProcessedRecord, RawRecord, FEATURE_NAMES};

/// Защита от деления на ноль при расчёте пульса
pub const EPSILON: f64 = 1e-6;

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Приблизительный пульс из вариабельности сигнала
    pub fn pulse_rate(variability: f64) -> f64 {
        60.0 / (variability + EPSILON)
    }

    /// Отношение AC/DC компонент
    pub fn acdc_ratio(variability: f64, ratio: f64) -> f64 {
        variability / ratio
    }

    /// Считает pulse_rate и acdc_ratio для каждой записи.
    /// Записи должны быть уже импутированы.
    pub fn derive(records: Vec<RawRecord>) -> Result<Vec<ProcessedRecord>> {
        let mut processed = Vec::with_capacity(records.len());

        for record in records {
            let ratio = record.ratio.ok_or_else(|| imputation_error("ratio"))?;
            let variability = record
                .variability
                .ok_or_else(|| imputation_error("variability"))?;
            let slope = record.slope.ok_or_else(|| imputation_error("slope"))?;

            let pulse_rate = Self::pulse_rate(variability);
            let acdc_ratio = Self::acdc_ratio(variability, ratio);

            // ratio == 0 даёт бесконечность, такие записи в модель не попадают
            if !pulse_rate.is_finite() || !acdc_ratio.is_finite() {
                tracing::warn!(
                    "Skipping record with non-finite derived features (ratio={}, variability={})",
                    ratio,
                    variability
                );
                continue;
            }

            processed.push(ProcessedRecord {
                timestamp: record.timestamp,
                ratio,
                variability,
                slope,
                glucose: record.glucose,
                pulse_rate,
                acdc_ratio,
            });
        }

        Ok(processed)
    }

    /// Матрица признаков (порядок `FEATURE_NAMES`) и вектор глюкозы
    pub fn to_matrix(records: &[ProcessedRecord]) -> (Array2<f64>, Array1<f64>) {
        let mut features = Array2::zeros((records.len(), FEATURE_NAMES.len()));
        let mut targets = Array1::zeros(records.len());

        for (i, record) in records.iter().enumerate() {
            for (j, value) in record.features().into_iter().enumerate() {
                features[[i, j]] = value;
            }
            targets[i] = record.glucose;
        }

        (features, targets)
    }
}

fn imputation_error(column: &str) -> PipelineError {
    PipelineError::Imputation {
        column: column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ratio: f64, variability: f64) -> RawRecord {
        RawRecord {
            timestamp: None,
            ratio: Some(ratio),
            variability: Some(variability),
            slope: Some(0.5),
            glucose: 120.0,
        }
    }

    #[test]
    fn test_derived_features() {
        let processed = FeatureEngineer::derive(vec![raw(2.0, 0.5)]).unwrap();
        let record = &processed[0];
        assert!((record.pulse_rate - 60.0 / (0.5 + 1e-6)).abs() < 1e-12);
        assert_eq!(record.acdc_ratio, 0.25);
    }

    #[test]
    fn test_zero_variability_is_finite() {
        let processed = FeatureEngineer::derive(vec![raw(1.0, 0.0)]).unwrap();
        assert_eq!(processed.len(), 1);
        assert!((processed[0].pulse_rate - 6.0e7).abs() < 1e-3);
    }

    #[test]
    fn test_zero_ratio_is_skipped() {
        let processed = FeatureEngineer::derive(vec![raw(0.0, 0.5), raw(1.0, 0.5)]).unwrap();
        assert_eq!(processed.len(), 1);
    }

    #[test]
    fn test_unimputed_record_is_rejected() {
        let mut record = raw(1.0, 0.5);
        record.slope = None;
        assert!(FeatureEngineer::derive(vec![record]).is_err());
    }

    #[test]
    fn test_to_matrix_order() {
        let processed = FeatureEngineer::derive(vec![raw(2.0, 0.5), raw(4.0, 1.0)]).unwrap();
        let (x, y) = FeatureEngineer::to_matrix(&processed);

        assert_eq!(x.dim(), (2, 5));
        assert_eq!(x[[0, 0]], 2.0);
        assert_eq!(x[[0, 1]], 0.5);
        assert_eq!(x[[0, 2]], 0.5);
        assert_eq!(x[[1, 4]], 0.25);
        assert_eq!(y.to_vec(), vec![120.0, 120.0]);
    }
}
