//! Базовая статистика по колонкам

use crate::types::ColumnSummary;

/// Квантиль с линейной интерполяцией между соседними порядковыми статистиками.
/// Возвращает `None` для пустого набора.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Выборочное стандартное отклонение (ddof = 1)
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub fn describe(name: &str, values: &[f64]) -> Option<ColumnSummary> {
    let mean = mean(values)?;
    Some(ColumnSummary {
        name: name.to_string(),
        count: values.len(),
        mean,
        std: sample_std(values),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        q25: quantile(values, 0.25)?,
        median: quantile(values, 0.5)?,
        q75: quantile(values, 0.75)?,
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}
