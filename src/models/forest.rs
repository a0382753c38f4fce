//! Случайный лес регрессионных деревьев

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{normalize, RegressionTree};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub random_state: u64,
    trees: Vec<RegressionTree>,
    feature_importances: Option<Array1<f64>>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, max_depth: usize, random_state: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            random_state,
            trees: Vec::new(),
            feature_importances: None,
        }
    }

    /// Деревья строятся последовательно, у каждого свой seed `random_state + номер`,
    /// поэтому результат воспроизводим.
    pub fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = X.nrows();
        if n_samples == 0 {
            return Err(PipelineError::EmptyDataset("random forest fit".to_string()));
        }

        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut importances = Array1::<f64>::zeros(X.ncols());

        for tree_idx in 0..self.n_estimators {
            let seed = self.random_state.wrapping_add(tree_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            // Бутстрэп-выборка
            let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

            let mut tree = RegressionTree::new(self.max_depth);
            tree.fit_indices(X, y, sample)?;
            importances += &tree.feature_importances();
            trees.push(tree);
        }

        self.feature_importances = Some(normalize(&importances.to_vec()));
        self.trees = trees;
        Ok(())
    }

    /// Среднее предсказание по деревьям
    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::NotFitted);
        }

        let mut predictions = Array1::<f64>::zeros(X.nrows());
        for tree in &self.trees {
            predictions += &tree.predict(X)?;
        }
        Ok(predictions / self.trees.len() as f64)
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let X = Array2::from_shape_fn((60, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = X.column(0).mapv(|v| 100.0 + 2.0 * v);
        (X, y)
    }

    #[test]
    fn test_forest_fits_trend() {
        let (X, y) = data();
        let mut forest = RandomForestRegressor::new(20, 5, 42);
        forest.fit(&X, &y).unwrap();
        assert_eq!(forest.n_trees(), 20);

        let predictions = forest.predict(&X).unwrap();
        let mae = (&predictions - &y).mapv(f64::abs).mean().unwrap();
        assert!(mae < 10.0, "MAE too high: {}", mae);
    }

    #[test]
    fn test_forest_is_deterministic() {
        let (X, y) = data();
        let mut a = RandomForestRegressor::new(10, 5, 42);
        let mut b = RandomForestRegressor::new(10, 5, 42);
        a.fit(&X, &y).unwrap();
        b.fit(&X, &y).unwrap();
        assert_eq!(a.predict(&X).unwrap(), b.predict(&X).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_forest_importances_sum_to_one() {
        let (X, y) = data();
        let mut forest = RandomForestRegressor::new(10, 5, 42);
        forest.fit(&X, &y).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert!((importances.sum() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_predict_requires_fit() {
        let (X, _) = data();
        let forest = RandomForestRegressor::new(10, 5, 42);
        assert!(forest.predict(&X).is_err());
    }
}
