//! Регрессионное дерево решений (CART, критерий MSE)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Лучшее разбиение узла
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    root: Option<TreeNode>,
    /// Суммарное уменьшение SSE по признакам, без нормализации
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            root: None,
            impurity_decrease: Vec::new(),
        }
    }

    pub fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fit_indices(X, y, (0..X.nrows()).collect())
    }

    /// Обучение на подмножестве строк. Повторы индексов допустимы (бутстрэп).
    pub fn fit_indices(&mut self, X: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>) -> Result<()> {
        if X.nrows() != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("y length = {}", X.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if indices.is_empty() {
            return Err(PipelineError::EmptyDataset("tree fit".to_string()));
        }

        let mut importances = vec![0.0; X.ncols()];
        self.root = Some(self.build_tree(X, y, indices, 0, &mut importances));
        self.impurity_decrease = importances;
        Ok(())
    }

    fn build_tree(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum) = indices
            .iter()
            .fold((0.0, 0.0), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
        let value = sum / n_samples as f64;
        let sse = sq_sum - sum * sum / n_samples as f64;

        let leaf = TreeNode::Leaf { value, n_samples };
        if depth >= self.max_depth || n_samples < self.min_samples_split || sse <= 1e-12 {
            return leaf;
        }

        let Some(split) = self.find_best_split(X, y, &indices, sum, sq_sum) else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| X[[i, split.feature]] <= split.threshold);

        importances[split.feature] += split.gain;

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build_tree(X, y, left_indices, depth + 1, importances)),
            right: Box::new(self.build_tree(X, y, right_indices, depth + 1, importances)),
        }
    }

    /// Перебор всех порогов между соседними различными значениями каждого признака.
    /// При равном выигрыше побеждает признак с меньшим номером.
    fn find_best_split(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        total_sum: f64,
        total_sq_sum: f64,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let parent_sse = total_sq_sum - total_sum * total_sum / n as f64;
        let mut best: Option<SplitCandidate> = None;

        let mut sorted = indices.to_vec();
        for feature in 0..X.ncols() {
            sorted.sort_by(|&a, &b| X[[a, feature]].total_cmp(&X[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq_sum = 0.0;

            for k in 0..n - 1 {
                let yi = y[sorted[k]];
                left_sum += yi;
                left_sq_sum += yi * yi;

                let current = X[[sorted[k], feature]];
                let next = X[[sorted[k + 1], feature]];
                if current >= next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq_sum = total_sq_sum - left_sq_sum;
                let left_sse = left_sq_sum - left_sum * left_sum / n_left as f64;
                let right_sse = right_sq_sum - right_sum * right_sum / n_right as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = (current + next) / 2.0;
                    // Середина может совпасть с правым значением из-за округления
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::NotFitted)?;
        Ok(X.rows()
            .into_iter()
            .map(|row| Self::predict_row(root, row))
            .collect())
    }

    fn predict_row(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    Self::predict_row(left, sample)
                } else {
                    Self::predict_row(right, sample)
                }
            }
        }
    }

    /// Уменьшение SSE по признакам без нормализации
    pub fn impurity_decrease(&self) -> &[f64] {
        &self.impurity_decrease
    }

    /// Нормализованные важности признаков (сумма 1, либо нули для листа-корня)
    pub fn feature_importances(&self) -> Array1<f64> {
        normalize(&self.impurity_decrease)
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

pub(crate) fn normalize(values: &[f64]) -> Array1<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        Array1::zeros(values.len())
    }
}
