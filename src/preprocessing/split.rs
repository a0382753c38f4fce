//! Детерминированное разбиение на обучающую и тестовую выборки

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{PipelineError, Result};

pub struct TrainTestSplit {
    pub X_train: Array2<f64>,
    pub X_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

pub fn validate_test_size(test_size: f64) -> Result<()> {
    if test_size > 0.0 && test_size < 1.0 {
        Ok(())
    } else {
        Err(PipelineError::Config(format!(
            "test size must be in (0, 1), got {}",
            test_size
        )))
    }
}

/// Перемешивает строки с фиксированным seed, первые ceil(test_size * n) идут в тест
pub fn train_test_split(
    X: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    validate_test_size(test_size)?;

    let n_samples = X.nrows();
    if n_samples != y.len() {
        return Err(PipelineError::Shape {
            expected: format!("y length = {}", n_samples),
            actual: format!("y length = {}", y.len()),
        });
    }
    if n_samples == 0 {
        return Err(PipelineError::EmptyDataset("train/test split".to_string()));
    }

    let n_test = (test_size * n_samples as f64).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_train == 0 {
        return Err(PipelineError::InsufficientData(format!(
            "{} samples with test size {} leave no training rows",
            n_samples, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        X_train: X.select(Axis(0), train_idx),
        X_test: X.select(Axis(0), test_idx),
        y_train: y.select(Axis(0), train_idx),
        y_test: y.select(Axis(0), test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let X = Array2::from_shape_fn((n, 2), |(i, j)| (i * 10 + j) as f64);
        let y = Array1::from_shape_fn(n, |i| i as f64);
        (X, y)
    }

    #[test]
    fn test_split_sizes() {
        let (X, y) = data(10);
        let split = train_test_split(&X, &y, 0.2, 42).unwrap();
        assert_eq!(split.X_train.nrows(), 8);
        assert_eq!(split.X_test.nrows(), 2);
        assert_eq!(split.y_train.len(), 8);
        assert_eq!(split.y_test.len(), 2);

        // Округление вверх для тестовой части
        let split = train_test_split(&X, &y, 0.25, 42).unwrap();
        assert_eq!(split.X_test.nrows(), 3);
    }

    #[test]
    fn test_split_is_reproducible() {
        let (X, y) = data(50);
        let a = train_test_split(&X, &y, 0.3, 42).unwrap();
        let b = train_test_split(&X, &y, 0.3, 42).unwrap();
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.X_train, b.X_train);
    }

    #[test]
    fn test_split_keeps_rows_aligned() {
        let (X, y) = data(20);
        let split = train_test_split(&X, &y, 0.2, 7).unwrap();
        for (row, target) in split.X_train.rows().into_iter().zip(split.y_train.iter()) {
            assert_eq!(row[0], target * 10.0);
        }
        let mut all: Vec<f64> = split.y_train.iter().chain(split.y_test.iter()).copied().collect();
        all.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(all, y.to_vec());
    }

    #[test]
    fn test_split_empty_dataset() {
        let (X, y) = data(0);
        assert!(matches!(
            train_test_split(&X, &y, 0.2, 42),
            Err(PipelineError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_split_single_row() {
        let (X, y) = data(1);
        assert!(matches!(
            train_test_split(&X, &y, 0.2, 42),
            Err(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_invalid_test_size() {
        let (X, y) = data(10);
        assert!(matches!(train_test_split(&X, &y, 0.0, 42), Err(PipelineError::Config(_))));
        assert!(matches!(train_test_split(&X, &y, 1.0, 42), Err(PipelineError::Config(_))));
    }
}
