//! Стандартизация признаков

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// (x - mean) / std по каждой колонке. Параметры считаются только на обучающей выборке.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(PipelineError::EmptyDataset("scaler fit".to_string()));
        }

        // Среднее и стандартное отклонение генеральной совокупности
        let mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::EmptyDataset("scaler fit".to_string()))?;
        let mut std = X.std_axis(Axis(0), 0.0);

        // Постоянные колонки не масштабируем
        std.mapv_inplace(|v| if v < 1e-10 { 1.0 } else { v });

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = self.params()?;
        Ok((X - mean) / std)
    }

    pub fn inverse_transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = self.params()?;
        Ok(X * std + mean)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn std(&self) -> Option<&Array1<f64>> {
        self.std.as_ref()
    }

    fn params(&self) -> Result<(&Array1<f64>, &Array1<f64>)> {
        match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => Ok((mean, std)),
            _ => Err(PipelineError::NotFitted),
        }
    }
}
