//! ML модели и их фабрика

#![allow(non_snake_case)]

pub mod boosting;
pub mod forest;
pub mod linear;
pub mod tree;

pub use boosting::GradientBoostingRegressor;
pub use forest::RandomForestRegressor;
pub use linear::LinearModel;
pub use tree::RegressionTree;

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DEFAULT_SEED: u64 = 42;

pub const FOREST_N_ESTIMATORS: usize = 100;
pub const FOREST_MAX_DEPTH: usize = 5;

pub const BOOSTING_N_ESTIMATORS: usize = 100;
pub const BOOSTING_LEARNING_RATE: f64 = 0.1;
pub const BOOSTING_MAX_DEPTH: usize = 3;

/// Семейство модели, выбирается по имени из CLI или конфигурации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Linear,
    RandomForest,
    GradientBoosting,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Linear,
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Linear => "linear",
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::GradientBoosting => "gradient_boosting",
        }
    }

    /// Имя класса модели, используется в именах артефактов
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::Linear => "LinearRegression",
            ModelFamily::RandomForest => "RandomForestRegressor",
            ModelFamily::GradientBoosting => "GradientBoostingRegressor",
        }
    }

    /// Строит и обучает модель выбранного семейства. Без повторов и запасных вариантов.
    pub fn fit(&self, X: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<TrainedModel> {
        tracing::info!("Training {} model on {} samples", self.name(), X.nrows());

        let model = match self {
            ModelFamily::Linear => TrainedModel::Linear(LinearModel::fit(X, y)?),
            ModelFamily::RandomForest => {
                let mut forest =
                    RandomForestRegressor::new(FOREST_N_ESTIMATORS, FOREST_MAX_DEPTH, seed);
                forest.fit(X, y)?;
                TrainedModel::RandomForest(forest)
            }
            ModelFamily::GradientBoosting => {
                let mut boosting = GradientBoostingRegressor::new(
                    BOOSTING_N_ESTIMATORS,
                    BOOSTING_LEARNING_RATE,
                    BOOSTING_MAX_DEPTH,
                    seed,
                );
                boosting.fit(X, y)?;
                TrainedModel::GradientBoosting(boosting)
            }
        };

        Ok(model)
    }
}

impl FromStr for ModelFamily {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        ModelFamily::ALL
            .into_iter()
            .find(|family| family.name() == s)
            .ok_or_else(|| PipelineError::UnsupportedModel {
                name: s.to_string(),
                supported: ModelFamily::ALL.iter().map(|f| f.name()).collect(),
            })
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Обученная модель вместе с параметрами своего семейства
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    Linear(LinearModel),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            TrainedModel::Linear(_) => ModelFamily::Linear,
            TrainedModel::RandomForest(_) => ModelFamily::RandomForest,
            TrainedModel::GradientBoosting(_) => ModelFamily::GradientBoosting,
        }
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::Linear(model) => model.predict(X),
            TrainedModel::RandomForest(model) => model.predict(X),
            TrainedModel::GradientBoosting(model) => model.predict(X),
        }
    }

    /// Важности признаков есть только у ансамблей деревьев
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        match self {
            TrainedModel::Linear(_) => None,
            TrainedModel::RandomForest(model) => model.feature_importances(),
            TrainedModel::GradientBoosting(model) => model.feature_importances(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_families() {
        assert_eq!("linear".parse::<ModelFamily>().unwrap(), ModelFamily::Linear);
        assert_eq!(
            "random_forest".parse::<ModelFamily>().unwrap(),
            ModelFamily::RandomForest
        );
        assert_eq!(
            "gradient_boosting".parse::<ModelFamily>().unwrap(),
            ModelFamily::GradientBoosting
        );
    }

    #[test]
    fn test_unsupported_model_lists_choices() {
        let err = "svm".parse::<ModelFamily>().unwrap_err();
        match &err {
            PipelineError::UnsupportedModel { name, supported } => {
                assert_eq!(name, "svm");
                assert_eq!(supported, &vec!["linear", "random_forest", "gradient_boosting"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("linear"));
        assert!(message.contains("random_forest"));
        assert!(message.contains("gradient_boosting"));
    }

    #[test]
    fn test_linear_recovers_known_relationship() {
        // glucose = 2 * ratio + 3, второй признак независим
        let X = array![[1.0, 0.3], [2.0, 0.1], [3.0, 0.7], [4.0, 0.2], [5.0, 0.9], [6.0, 0.4]];
        let y = X.column(0).mapv(|r| 2.0 * r + 3.0);

        let model = ModelFamily::Linear.fit(&X, &y, DEFAULT_SEED).unwrap();
        let TrainedModel::Linear(linear) = &model else {
            panic!("expected linear model");
        };
        assert!((linear.intercept - 3.0).abs() < 1e-8);
        assert!((linear.coefficients[0] - 2.0).abs() < 1e-8);
        assert!(linear.coefficients[1].abs() < 1e-8);
        assert!(model.feature_importances().is_none());
    }

    #[test]
    fn test_ensembles_expose_importances() {
        let X = Array2::from_shape_fn((40, 3), |(i, j)| ((i * (j + 1)) % 17) as f64);
        let y = X.column(0).mapv(|v| 100.0 + 5.0 * v);

        for family in [ModelFamily::RandomForest, ModelFamily::GradientBoosting] {
            let model = family.fit(&X, &y, DEFAULT_SEED).unwrap();
            assert_eq!(model.family(), family);
            let importances = model.feature_importances().unwrap();
            assert_eq!(importances.len(), 3);
            assert_eq!(model.predict(&X).unwrap().len(), 40);
        }
    }
}
