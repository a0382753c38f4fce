//! Запуск обучения целиком: загрузка -> подготовка -> разбиение -> обучение -> оценка -> экспорт

#![allow(non_snake_case)]

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::evaluation::{evaluate, EvaluationResult};
use crate::export::{export_model, ExportedArtifact};
use crate::loader::{load_dataset, raw_summary};
use crate::models::TrainedModel;
use crate::preprocessing::{train_test_split, FeatureEngineer, Preprocessor, StandardScaler};
use crate::report::Reporter;

/// Результат одного запуска
pub struct PipelineOutcome {
    pub model: TrainedModel,
    pub scaler: StandardScaler,
    pub evaluation: EvaluationResult,
    pub artifact: ExportedArtifact,
    pub n_train: usize,
    pub n_test: usize,
}

pub fn run(config: &PipelineConfig, reporter: &dyn Reporter) -> Result<PipelineOutcome> {
    config.validate()?;

    let dataset = load_dataset(&config.data_path)?;
    tracing::info!(
        "Loaded {} records from {} file(s)",
        dataset.len(),
        dataset.sources.len()
    );
    reporter.report_statistics("Dataset statistics", &raw_summary(&dataset))?;

    let records = Preprocessor::process(&dataset)?;
    reporter.report_statistics("Processed data statistics", &Preprocessor::summary(&records))?;

    let (X, y) = FeatureEngineer::to_matrix(&records);
    let split = train_test_split(&X, &y, config.test_size, config.seed)?;
    tracing::info!(
        "Split: {} training / {} test samples",
        split.X_train.nrows(),
        split.X_test.nrows()
    );

    // Скейлер видит только обучающую выборку
    let mut scaler = StandardScaler::new();
    let X_train = scaler.fit_transform(&split.X_train)?;
    let X_test = scaler.transform(&split.X_test)?;

    let model = config.model.fit(&X_train, &split.y_train, config.seed)?;
    let evaluation = evaluate(&model, &X_test, &split.y_test)?;

    let artifact = export_model(&model, &scaler, &config.output_dir)?;
    reporter.report_evaluation(config.model.display_name(), &evaluation)?;

    Ok(PipelineOutcome {
        n_train: X_train.nrows(),
        n_test: X_test.nrows(),
        model,
        scaler,
        evaluation,
        artifact,
    })
}
