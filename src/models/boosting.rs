//! Градиентный бустинг с квадратичной функцией потерь

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{normalize, RegressionTree};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Доля строк на каждой стадии, 1.0 = без подвыборки
    pub subsample: f64,
    pub random_state: u64,
    initial_prediction: f64,
    trees: Vec<RegressionTree>,
    feature_importances: Option<Array1<f64>>,
}

impl GradientBoostingRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize, random_state: u64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            subsample: 1.0,
            random_state,
            initial_prediction: 0.0,
            trees: Vec::new(),
            feature_importances: None,
        }
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = X.nrows();
        if n_samples == 0 {
            return Err(PipelineError::EmptyDataset("gradient boosting fit".to_string()));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(PipelineError::Config(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let n_subsample = ((n_samples as f64 * self.subsample) as usize).max(1);

        // Начальное приближение: среднее цели
        let initial = y.mean().unwrap_or(0.0);
        let mut current = Array1::from_elem(n_samples, initial);
        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut decrease = vec![0.0; X.ncols()];

        for _ in 0..self.n_estimators {
            // Антиградиент MSE = остатки
            let residuals = y - &current;

            let rows: Vec<usize> = if n_subsample < n_samples {
                let mut rows = sample(&mut rng, n_samples, n_subsample).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n_samples).collect()
            };

            let mut tree = RegressionTree::new(self.max_depth);
            tree.fit_indices(X, &residuals, rows)?;

            current = current + tree.predict(X)? * self.learning_rate;
            for (total, d) in decrease.iter_mut().zip(tree.impurity_decrease()) {
                *total += d;
            }
            trees.push(tree);
        }

        self.initial_prediction = initial;
        self.feature_importances = Some(normalize(&decrease));
        self.trees = trees;
        Ok(())
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::NotFitted);
        }

        let mut predictions = Array1::from_elem(X.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions = predictions + tree.predict(X)? * self.learning_rate;
        }
        Ok(predictions)
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let X = Array2::from_shape_fn((50, 2), |(i, j)| if j == 0 { i as f64 / 10.0 } else { 1.0 });
        let y = X.column(0).mapv(|v| 80.0 + 30.0 * v * v);
        (X, y)
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (X, y) = data();
        let mut model = GradientBoostingRegressor::new(100, 0.1, 3, 42);
        model.fit(&X, &y).unwrap();
        assert_eq!(model.n_stages(), 100);

        let predictions = model.predict(&X).unwrap();
        let mae = (&predictions - &y).mapv(f64::abs).mean().unwrap();
        let baseline = (&y - y.mean().unwrap()).mapv(f64::abs).mean().unwrap();
        assert!(mae < baseline * 0.1, "MAE {} vs baseline {}", mae, baseline);
    }

    #[test]
    fn test_boosting_importances() {
        let (X, y) = data();
        let mut model = GradientBoostingRegressor::new(20, 0.1, 3, 42);
        model.fit(&X, &y).unwrap();

        let importances = model.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_subsample_is_deterministic() {
        let (X, y) = data();
        let mut a = GradientBoostingRegressor::new(30, 0.1, 3, 7).with_subsample(0.5);
        let mut b = GradientBoostingRegressor::new(30, 0.1, 3, 7).with_subsample(0.5);
        a.fit(&X, &y).unwrap();
        b.fit(&X, &y).unwrap();
        assert_eq!(a.predict(&X).unwrap(), b.predict(&X).unwrap());
    }

    #[test]
    fn test_invalid_subsample() {
        let (X, y) = data();
        let mut model = GradientBoostingRegressor::new(10, 0.1, 3, 42).with_subsample(0.0);
        assert!(matches!(model.fit(&X, &y), Err(PipelineError::Config(_))));
    }
}
