//! Оценка модели: метрики ошибки и клиническая точность

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::TrainedModel;
use crate::types::FEATURE_NAMES;

/// Допуски клинической точности, mg/dL
pub const CLINICAL_TOLERANCE_STRICT: f64 = 15.0;
pub const CLINICAL_TOLERANCE_LOOSE: f64 = 20.0;

/// Границы гипо- и гипергликемии сетки Кларка, mg/dL
pub const HYPOGLYCEMIA: f64 = 70.0;
pub const HYPERGLYCEMIA: f64 = 180.0;

/// Зоны сетки ошибок Кларка
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClarkeZone {
    /// Клинически точные
    A,
    /// Отклонение без опасных последствий
    B,
    /// Избыточная коррекция
    C,
    /// Пропущенная гипо- или гипергликемия
    D,
    /// Ошибочное лечение
    E,
}

impl ClarkeZone {
    pub const ALL: [ClarkeZone; 5] = [
        ClarkeZone::A,
        ClarkeZone::B,
        ClarkeZone::C,
        ClarkeZone::D,
        ClarkeZone::E,
    ];

    pub fn classify(reference: f64, predicted: f64) -> Self {
        let (r, p) = (reference, predicted);

        if (r <= HYPOGLYCEMIA && p <= HYPOGLYCEMIA) || (p <= 1.2 * r && p >= 0.8 * r) {
            ClarkeZone::A
        } else if (r >= HYPERGLYCEMIA && p <= HYPOGLYCEMIA) || (r <= HYPOGLYCEMIA && p >= HYPERGLYCEMIA) {
            ClarkeZone::E
        } else if (r >= HYPOGLYCEMIA && r <= 290.0 && p >= r + 110.0)
            || (r >= 130.0 && r <= HYPERGLYCEMIA && p <= (7.0 / 5.0) * r - 182.0)
        {
            ClarkeZone::C
        } else if (r >= 240.0 && p >= HYPOGLYCEMIA && p <= HYPERGLYCEMIA)
            || (r <= 175.0 / 3.0 && p <= HYPERGLYCEMIA && p >= HYPOGLYCEMIA)
            || (r >= 175.0 / 3.0 && r <= HYPOGLYCEMIA && p >= (6.0 / 5.0) * r)
        {
            ClarkeZone::D
        } else {
            ClarkeZone::B
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClarkeZone::A => "A",
            ClarkeZone::B => "B",
            ClarkeZone::C => "C",
            ClarkeZone::D => "D",
            ClarkeZone::E => "E",
        }
    }
}

/// Распределение точек по зонам Кларка
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClarkeSummary {
    pub counts: [usize; 5],
    pub total: usize,
}

impl ClarkeSummary {
    pub fn from_zones(zones: &[ClarkeZone]) -> Self {
        let mut counts = [0usize; 5];
        for zone in zones {
            counts[*zone as usize] += 1;
        }
        Self {
            counts,
            total: zones.len(),
        }
    }

    pub fn count(&self, zone: ClarkeZone) -> usize {
        self.counts[zone as usize]
    }

    pub fn percentage(&self, zone: ClarkeZone) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(zone) as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub actuals: Array1<f64>,
    pub predictions: Array1<f64>,
    /// Процент предсказаний с ошибкой < 15 mg/dL
    pub within_15_pct: f64,
    /// Процент предсказаний с ошибкой < 20 mg/dL
    pub within_20_pct: f64,
    pub zones: Vec<ClarkeZone>,
    pub clarke: ClarkeSummary,
    /// По убыванию, только для ансамблей
    pub feature_importances: Option<Vec<FeatureImportance>>,
}

impl EvaluationResult {
    pub fn residuals(&self) -> Array1<f64> {
        &self.actuals - &self.predictions
    }
}

pub fn evaluate(model: &TrainedModel, X_test: &Array2<f64>, y_test: &Array1<f64>) -> Result<EvaluationResult> {
    if X_test.nrows() == 0 {
        return Err(PipelineError::EmptyDataset("evaluation".to_string()));
    }
    if X_test.nrows() != y_test.len() {
        return Err(PipelineError::Shape {
            expected: format!("y length = {}", X_test.nrows()),
            actual: format!("y length = {}", y_test.len()),
        });
    }

    let predictions = model.predict(X_test)?;
    let zones: Vec<ClarkeZone> = y_test
        .iter()
        .zip(predictions.iter())
        .map(|(r, p)| ClarkeZone::classify(*r, *p))
        .collect();

    let result = EvaluationResult {
        mae: mean_absolute_error(y_test, &predictions),
        rmse: mean_squared_error(y_test, &predictions).sqrt(),
        r2: r2_score(y_test, &predictions),
        within_15_pct: within_tolerance_pct(y_test, &predictions, CLINICAL_TOLERANCE_STRICT),
        within_20_pct: within_tolerance_pct(y_test, &predictions, CLINICAL_TOLERANCE_LOOSE),
        clarke: ClarkeSummary::from_zones(&zones),
        zones,
        feature_importances: model.feature_importances().map(rank_importances).transpose()?,
        actuals: y_test.clone(),
        predictions,
    };

    tracing::info!(
        "Evaluation on {} samples: MAE {:.2}, RMSE {:.2}, R2 {:.3}",
        y_test.len(),
        result.mae,
        result.rmse,
        result.r2
    );

    Ok(result)
}

pub fn mean_absolute_error(actual: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    (actual - predicted).mapv(f64::abs).mean().unwrap_or(f64::NAN)
}

pub fn mean_squared_error(actual: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    (actual - predicted).mapv(|e| e * e).mean().unwrap_or(f64::NAN)
}

/// Коэффициент детерминации. Для постоянной цели: 1.0 при точном совпадении, иначе 0.0.
pub fn r2_score(actual: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    let Some(mean) = actual.mean() else {
        return f64::NAN;
    };
    let ss_res: f64 = (actual - predicted).mapv(|e| e * e).sum();
    let ss_tot: f64 = actual.mapv(|v| (v - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Процент точек со строго меньшей ошибкой, чем `tolerance`
pub fn within_tolerance_pct(actual: &Array1<f64>, predicted: &Array1<f64>, tolerance: f64) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, p)| (*a - *p).abs() < tolerance)
        .count();
    hits as f64 / actual.len() as f64 * 100.0
}

/// Важности с именами признаков, по убыванию. Длина должна совпадать с `FEATURE_NAMES`.
pub fn rank_importances(importances: &Array1<f64>) -> Result<Vec<FeatureImportance>> {
    if importances.len() != FEATURE_NAMES.len() {
        return Err(PipelineError::Shape {
            expected: format!("{} feature importances", FEATURE_NAMES.len()),
            actual: format!("{} feature importances", importances.len()),
        });
    }

    let mut ranked: Vec<FeatureImportance> = FEATURE_NAMES
        .iter()
        .zip(importances.iter())
        .map(|(name, importance)| FeatureImportance {
            feature: name.to_string(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinearModel;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn identity_model() -> TrainedModel {
        TrainedModel::Linear(LinearModel {
            intercept: 0.0,
            coefficients: array![1.0],
        })
    }

    #[test]
    fn test_metrics() {
        let actual = array![100.0, 150.0, 200.0, 250.0];
        let predicted = array![110.0, 140.0, 200.0, 270.0];

        assert_abs_diff_eq!(mean_absolute_error(&actual, &predicted), 10.0);
        assert_abs_diff_eq!(mean_squared_error(&actual, &predicted), 150.0);
        // ss_tot = 12500, ss_res = 600
        assert_abs_diff_eq!(r2_score(&actual, &predicted), 1.0 - 600.0 / 12500.0, epsilon = 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        let actual = array![100.0, 100.0];
        assert_eq!(r2_score(&actual, &array![100.0, 100.0]), 1.0);
        assert_eq!(r2_score(&actual, &array![90.0, 100.0]), 0.0);
    }

    #[test]
    fn test_clinical_accuracy_is_strict() {
        let actual = array![100.0, 100.0, 100.0, 100.0];
        let predicted = array![115.0, 114.9, 119.0, 120.0];

        assert_eq!(within_tolerance_pct(&actual, &predicted, 15.0), 25.0);
        assert_eq!(within_tolerance_pct(&actual, &predicted, 20.0), 75.0);
    }

    #[test]
    fn test_within_15_never_exceeds_within_20() {
        let actual: Array1<f64> = (0..50).map(|i| 60.0 + i as f64 * 6.0).collect();
        let predicted: Array1<f64> = actual
            .iter()
            .enumerate()
            .map(|(i, a)| a + ((i * 7) % 31) as f64 - 15.0)
            .collect();

        let strict = within_tolerance_pct(&actual, &predicted, CLINICAL_TOLERANCE_STRICT);
        let loose = within_tolerance_pct(&actual, &predicted, CLINICAL_TOLERANCE_LOOSE);
        assert!(strict <= loose);
    }

    #[test]
    fn test_clarke_zones() {
        assert_eq!(ClarkeZone::classify(100.0, 110.0), ClarkeZone::A);
        assert_eq!(ClarkeZone::classify(60.0, 65.0), ClarkeZone::A);
        assert_eq!(ClarkeZone::classify(200.0, 260.0), ClarkeZone::B);
        assert_eq!(ClarkeZone::classify(100.0, 220.0), ClarkeZone::C);
        assert_eq!(ClarkeZone::classify(300.0, 150.0), ClarkeZone::D);
        assert_eq!(ClarkeZone::classify(50.0, 100.0), ClarkeZone::D);
        assert_eq!(ClarkeZone::classify(250.0, 60.0), ClarkeZone::E);
        assert_eq!(ClarkeZone::classify(60.0, 200.0), ClarkeZone::E);
    }

    #[test]
    fn test_evaluate_with_linear_model() {
        let X = array![[100.0], [150.0], [200.0]];
        let y = array![105.0, 150.0, 230.0];

        let result = evaluate(&identity_model(), &X, &y).unwrap();
        assert_abs_diff_eq!(result.mae, 35.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.within_15_pct, 200.0 / 3.0, epsilon = 1e-9);
        assert_eq!(result.clarke.count(ClarkeZone::A), 3);
        assert_eq!(result.clarke.percentage(ClarkeZone::A), 100.0);
        assert!(result.feature_importances.is_none());
        assert_eq!(result.residuals(), array![5.0, 0.0, 30.0]);
    }

    #[test]
    fn test_evaluate_empty() {
        let X = Array2::<f64>::zeros((0, 1));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(
            evaluate(&identity_model(), &X, &y),
            Err(PipelineError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_rank_importances_descending() {
        let ranked = rank_importances(&array![0.1, 0.4, 0.05, 0.3, 0.15]).unwrap();
        let names: Vec<&str> = ranked.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(names, vec!["variability", "pulse_rate", "acdc_ratio", "ratio", "slope"]);
    }

    #[test]
    fn test_rank_importances_rejects_width_mismatch() {
        assert!(matches!(
            rank_importances(&array![0.5, 0.5]),
            Err(PipelineError::Shape { .. })
        ));
    }

    #[test]
    fn test_evaluate_rejects_foreign_ensemble_width() {
        // Лес, обученный на трёх признаках вместо пяти
        let X = Array2::from_shape_fn((30, 3), |(i, j)| ((i * (j + 2)) % 11) as f64);
        let y = X.column(0).mapv(|v| 100.0 + 3.0 * v);
        let mut forest = crate::models::RandomForestRegressor::new(5, 3, 42);
        forest.fit(&X, &y).unwrap();

        assert!(matches!(
            evaluate(&TrainedModel::RandomForest(forest), &X, &y),
            Err(PipelineError::Shape { .. })
        ));
    }
}
