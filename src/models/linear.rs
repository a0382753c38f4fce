//! Линейная регрессия (метод наименьших квадратов)

#![allow(non_snake_case)]

use linfa::traits::Fit;
use linfa::Dataset;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Относительный остаток колонки после проекции на уже выбранные,
/// ниже которого колонка считается линейно зависимой
const RANK_TOLERANCE: f64 = 1e-7;

/// Свободный член и коэффициенты в порядке признаков
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Array1<f64>,
}

impl LinearModel {
    /// МНК со свободным членом. Постоянные и линейно зависимые колонки
    /// исключаются из решения и получают коэффициент 0, предсказания
    /// при этом совпадают с любым другим решением МНК.
    pub fn fit(X: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if X.nrows() == 0 {
            return Err(PipelineError::EmptyDataset("linear fit".to_string()));
        }
        if X.nrows() != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("y length = {}", X.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let selected = independent_columns(X);
        let mut coefficients = Array1::<f64>::zeros(X.ncols());

        if selected.len() < X.ncols() {
            tracing::warn!(
                "Linear fit: {} of {} features are constant or collinear, their coefficients are set to 0",
                X.ncols() - selected.len(),
                X.ncols()
            );
        }

        if selected.is_empty() {
            let intercept = y.mean().unwrap_or(0.0);
            return Ok(Self {
                intercept,
                coefficients,
            });
        }

        let dataset = Dataset::new(X.select(Axis(1), &selected), y.clone());
        let fitted = LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| PipelineError::Fit(e.to_string()))?;

        for (&column, &value) in selected.iter().zip(fitted.params().iter()) {
            coefficients[column] = value;
        }

        Ok(Self {
            intercept: fitted.intercept(),
            coefficients,
        })
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if X.ncols() != self.coefficients.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", self.coefficients.len()),
                actual: format!("{} features", X.ncols()),
            });
        }
        Ok(X.dot(&self.coefficients) + self.intercept)
    }
}

/// Индексы колонок, образующих базис центрированной матрицы (Грам-Шмидт слева направо)
fn independent_columns(X: &Array2<f64>) -> Vec<usize> {
    let Some(mean) = X.mean_axis(Axis(0)) else {
        return Vec::new();
    };
    let centered = X - &mean;

    let mut basis: Vec<Array1<f64>> = Vec::new();
    let mut selected = Vec::new();

    for (j, column) in X.columns().into_iter().enumerate() {
        let first = column[0];
        let scale = first.abs().max(1.0);
        if column.iter().all(|v| (v - first).abs() <= 1e-12 * scale) {
            continue;
        }

        let original = centered.column(j).to_owned();
        let norm = original.dot(&original).sqrt();
        let mut residual = original;
        for q in &basis {
            let projection = residual.dot(q);
            residual.scaled_add(-projection, q);
        }

        let remaining = residual.dot(&residual).sqrt();
        if remaining > RANK_TOLERANCE * norm {
            basis.push(residual / remaining);
            selected.push(j);
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_recovers_exact_relationship() {
        let X = array![[1.0, 0.5], [2.0, -1.0], [3.0, 2.0], [4.0, 0.0], [5.0, 1.5]];
        let y = X.column(0).mapv(|v| 2.0 * v + 3.0) - X.column(1).mapv(|v| 0.5 * v);

        let model = LinearModel::fit(&X, &y).unwrap();
        assert_abs_diff_eq!(model.intercept, 3.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[1], -0.5, epsilon = 1e-8);

        let predictions = model.predict(&X).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert_abs_diff_eq!(*p, *t, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_zero_column_gets_zero_coefficient() {
        // Так выглядит постоянный признак после стандартизации
        let X = Array2::from_shape_fn((20, 3), |(i, j)| match j {
            0 => i as f64,
            1 => 0.0,
            _ => ((i * 7) % 5) as f64,
        });
        let y = X.column(0).mapv(|v| 1.5 * v + 10.0) + X.column(2).mapv(|v| 2.0 * v);

        let model = LinearModel::fit(&X, &y).unwrap();
        assert_eq!(model.coefficients.len(), 3);
        assert_eq!(model.coefficients[1], 0.0);
        assert_abs_diff_eq!(model.coefficients[0], 1.5, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[2], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.intercept, 10.0, epsilon = 1e-8);
    }

    #[test]
    fn test_collinear_columns_still_fit() {
        // Вторая колонка - аффинная функция первой
        let X = Array2::from_shape_fn((12, 2), |(i, j)| if j == 0 { i as f64 } else { 3.0 * i as f64 - 1.0 });
        let y = X.column(0).mapv(|v| 4.0 * v + 2.0);

        let model = LinearModel::fit(&X, &y).unwrap();
        assert_eq!(model.coefficients[1], 0.0);
        let predictions = model.predict(&X).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert_abs_diff_eq!(*p, *t, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_all_constant_columns_predict_mean() {
        let X = array![[1.0, 5.0], [1.0, 5.0], [1.0, 5.0]];
        let y = array![100.0, 110.0, 120.0];

        let model = LinearModel::fit(&X, &y).unwrap();
        assert_eq!(model.coefficients, array![0.0, 0.0]);
        assert_abs_diff_eq!(model.intercept, 110.0, epsilon = 1e-12);
    }

    #[test]
    fn test_independent_columns() {
        let X = array![[1.0, 0.0, 2.0], [2.0, 0.0, 4.0], [3.0, 0.0, 6.0], [4.0, 0.0, 1.0]];
        assert_eq!(independent_columns(&X), vec![0, 2]);
    }

    #[test]
    fn test_predict_checks_width() {
        let model = LinearModel {
            intercept: 1.0,
            coefficients: array![1.0, 2.0],
        };
        assert!(model.predict(&array![[1.0, 2.0, 3.0]]).is_err());
        assert_eq!(model.predict(&array![[1.0, 2.0]]).unwrap(), array![6.0]);
    }
}
