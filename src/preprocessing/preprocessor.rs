//! Полная подготовка данных перед обучением

use crate::error::Result;
use crate::preprocessing::cleaning::{filter_physiological, impute_missing, remove_outliers};
use crate::preprocessing::statistics::describe;
use crate::preprocessing::FeatureEngineer;
use crate::types::{ColumnSummary, Dataset, ProcessedRecord};

pub struct Preprocessor;

impl Preprocessor {
    /// Импутация -> фильтр глюкозы -> производные признаки -> выбросы.
    ///
    /// Пустой результат не является ошибкой здесь, он всплывает при разбиении.
    pub fn process(dataset: &Dataset) -> Result<Vec<ProcessedRecord>> {
        let imputed = impute_missing(dataset.records.clone())?;

        let filtered = filter_physiological(imputed);
        tracing::info!(
            "Physiological filter kept {} of {} records",
            filtered.len(),
            dataset.len()
        );

        let derived = FeatureEngineer::derive(filtered)?;
        let cleaned = remove_outliers(derived);
        tracing::info!("Processed data: {} records", cleaned.len());

        if cleaned.is_empty() {
            tracing::warn!("Preprocessing removed all records");
        }

        Ok(cleaned)
    }

    pub fn summary(records: &[ProcessedRecord]) -> Vec<ColumnSummary> {
        let columns: [(&str, fn(&ProcessedRecord) -> f64); 6] = [
            ("ratio", |r| r.ratio),
            ("variability", |r| r.variability),
            ("slope", |r| r.slope),
            ("glucose", |r| r.glucose),
            ("pulse_rate", |r| r.pulse_rate),
            ("acdc_ratio", |r| r.acdc_ratio),
        ];

        columns
            .iter()
            .filter_map(|(name, value_of)| {
                let values: Vec<f64> = records.iter().map(value_of).collect();
                describe(name, &values)
            })
            .collect()
    }
}
