//! Наблюдательные отчёты: таблицы статистики, сводка метрик, данные для графиков.
//! Ничего здесь не влияет на численный результат конвейера.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::evaluation::{ClarkeZone, EvaluationResult, FeatureImportance};
use crate::types::ColumnSummary;

pub trait Reporter {
    fn report_statistics(&self, title: &str, summary: &[ColumnSummary]) -> Result<()>;

    fn report_evaluation(&self, model_name: &str, result: &EvaluationResult) -> Result<()>;
}

/// Ничего не выводит
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report_statistics(&self, _title: &str, _summary: &[ColumnSummary]) -> Result<()> {
        Ok(())
    }

    fn report_evaluation(&self, _model_name: &str, _result: &EvaluationResult) -> Result<()> {
        Ok(())
    }
}

/// Печать в консоль
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn render_statistics(title: &str, summary: &[ColumnSummary]) -> String {
        let mut out = format!("\n{}:\n", title);
        out.push_str(&format!(
            "{:<12} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        ));
        for s in summary {
            out.push_str(&format!(
                "{:<12} {:>8} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}\n",
                s.name, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
            ));
        }
        out
    }

    pub fn render_evaluation(model_name: &str, result: &EvaluationResult) -> String {
        let line = "=".repeat(60);
        let mut out = format!("\n{}\nMODEL EVALUATION RESULTS ({})\n{}\n", line, model_name, line);
        out.push_str(&format!("MAE: {:.2} mg/dL\n", result.mae));
        out.push_str(&format!("RMSE: {:.2} mg/dL\n", result.rmse));
        out.push_str(&format!("R² Score: {:.2}\n", result.r2));
        out.push_str(&format!(
            "Clinical Accuracy (within 15 mg/dL): {:.1}%\n",
            result.within_15_pct
        ));
        out.push_str(&format!(
            "Clinical Accuracy (within 20 mg/dL): {:.1}%\n",
            result.within_20_pct
        ));

        out.push_str("Clarke Error Grid:");
        for zone in ClarkeZone::ALL {
            out.push_str(&format!(
                " {} {:.1}%",
                zone.label(),
                result.clarke.percentage(zone)
            ));
        }
        out.push('\n');

        if let Some(importances) = &result.feature_importances {
            out.push_str("Feature importances:\n");
            for FeatureImportance { feature, importance } in importances {
                out.push_str(&format!("  {:<12} {:.4}\n", feature, importance));
            }
        }
        out
    }
}

impl Reporter for ConsoleReporter {
    fn report_statistics(&self, title: &str, summary: &[ColumnSummary]) -> Result<()> {
        print!("{}", Self::render_statistics(title, summary));
        Ok(())
    }

    fn report_evaluation(&self, model_name: &str, result: &EvaluationResult) -> Result<()> {
        print!("{}", Self::render_evaluation(model_name, result));
        Ok(())
    }
}

#[derive(Serialize)]
struct GridPoint {
    reference: f64,
    predicted: f64,
    zone: ClarkeZone,
}

#[derive(Serialize)]
struct ResidualPoint {
    predicted: f64,
    residual: f64,
}

#[derive(Serialize)]
struct ScatterPoint {
    reference: f64,
    predicted: f64,
}

/// Оборачивает другой отчёт и дополнительно пишет JSON для графиков
pub struct DiagnosticsReporter<R: Reporter> {
    inner: R,
    dir: PathBuf,
}

impl<R: Reporter> DiagnosticsReporter<R> {
    pub fn new(inner: R, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|source| PipelineError::Export {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(file_name);
        let json = serde_json::to_vec_pretty(value)?;
        fs::write(&path, json).map_err(|source| PipelineError::Export {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Wrote diagnostics to {}", path.display());
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl<R: Reporter> Reporter for DiagnosticsReporter<R> {
    fn report_statistics(&self, title: &str, summary: &[ColumnSummary]) -> Result<()> {
        self.inner.report_statistics(title, summary)
    }

    fn report_evaluation(&self, model_name: &str, result: &EvaluationResult) -> Result<()> {
        self.inner.report_evaluation(model_name, result)?;

        let grid: Vec<GridPoint> = result
            .actuals
            .iter()
            .zip(result.predictions.iter())
            .zip(result.zones.iter())
            .map(|((r, p), zone)| GridPoint {
                reference: *r,
                predicted: *p,
                zone: *zone,
            })
            .collect();
        self.write_json(&format!("clarke_grid_{}.json", model_name), &grid)?;

        let residuals: Vec<ResidualPoint> = result
            .predictions
            .iter()
            .zip(result.residuals().iter())
            .map(|(p, e)| ResidualPoint {
                predicted: *p,
                residual: *e,
            })
            .collect();
        self.write_json(&format!("residuals_{}.json", model_name), &residuals)?;

        if let Some(importances) = &result.feature_importances {
            self.write_json(&format!("feature_importance_{}.json", model_name), importances)?;
        }

        let scatter: Vec<ScatterPoint> = result
            .actuals
            .iter()
            .zip(result.predictions.iter())
            .map(|(r, p)| ScatterPoint {
                reference: *r,
                predicted: *p,
            })
            .collect();
        self.write_json("glucose_predictions_scatter.json", &scatter)?;

        Ok(())
    }
}
