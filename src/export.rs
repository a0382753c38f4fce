//! Экспорт обученной модели для прошивки микроконтроллера

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::models::TrainedModel;
use crate::preprocessing::StandardScaler;
use crate::types::FEATURE_NAMES;

pub const HEADER_FILE_NAME: &str = "model_coefficients.h";
const HEADER_GUARD: &str = "MODEL_COEFFICIENTS_H";

/// Записанные артефакты одного запуска
#[derive(Debug, Clone)]
pub struct ExportedArtifact {
    /// Таблица коэффициентов или сериализованная модель
    pub primary: PathBuf,
    /// Заголовок с константами, только для линейной модели
    pub header: Option<PathBuf>,
    /// Можно ли вычислить модель на микроконтроллере
    pub deployable: bool,
}

/// Ансамбль вместе со скейлером, с которым он обучался
#[derive(Serialize)]
struct ModelBundle<'a> {
    model_type: &'static str,
    features: &'a [&'static str],
    scaler: &'a StandardScaler,
    model: &'a TrainedModel,
}

/// Сохраняет параметры модели в `output_dir`, имя файла содержит модель и время запуска
pub fn export_model(
    model: &TrainedModel,
    scaler: &StandardScaler,
    output_dir: &Path,
) -> Result<ExportedArtifact> {
    fs::create_dir_all(output_dir).map_err(|source| PipelineError::Export {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let model_name = model.family().display_name();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

    match model {
        TrainedModel::Linear(linear) => {
            let rows = coefficient_rows(linear.intercept, linear.coefficients.iter().copied());

            // Оба файла готовятся в памяти, на диск попадают либо оба, либо ни одного
            let csv = render_coefficients_csv(&rows)?;
            let header_text = render_firmware_header(&rows, scaler);

            let primary = unique_path(output_dir, &format!("{}_coeff_{}", model_name, timestamp), "csv");
            write_artifact(&primary, &csv)?;

            let header = output_dir.join(HEADER_FILE_NAME);
            if let Err(e) = write_artifact(&header, header_text.as_bytes()) {
                let _ = fs::remove_file(&primary);
                return Err(e);
            }
            tracing::info!("Saved firmware header to: {}", header.display());
            tracing::info!("Saved coefficients to: {}", primary.display());

            Ok(ExportedArtifact {
                primary,
                header: Some(header),
                deployable: true,
            })
        }
        TrainedModel::RandomForest(_) | TrainedModel::GradientBoosting(_) => {
            let primary = unique_path(output_dir, &format!("{}_{}", model_name, timestamp), "json");
            let bundle = ModelBundle {
                model_type: model.family().name(),
                features: &FEATURE_NAMES,
                scaler,
                model,
            };
            let json = serde_json::to_vec(&bundle)?;
            write_artifact(&primary, &json)?;

            tracing::warn!("Tree-based models require TinyML conversion for microcontroller deployment");
            tracing::info!("Exported {} for offline reference: {}", model_name, primary.display());

            Ok(ExportedArtifact {
                primary,
                header: None,
                deployable: false,
            })
        }
    }
}

/// Пары (имя, значение): сначала intercept, затем признаки по порядку
pub fn coefficient_rows(intercept: f64, coefficients: impl IntoIterator<Item = f64>) -> Vec<(String, f64)> {
    std::iter::once(("intercept".to_string(), intercept))
        .chain(
            FEATURE_NAMES
                .iter()
                .map(|name| name.to_string())
                .zip(coefficients),
        )
        .collect()
}

fn render_coefficients_csv(rows: &[(String, f64)]) -> Result<Vec<u8>> {
    let features: Vec<&str> = rows.iter().map(|(name, _)| name.as_str()).collect();
    let coefficients: Vec<f64> = rows.iter().map(|(_, value)| *value).collect();
    let mut df = df!(
        "feature" => features,
        "coefficient" => coefficients
    )?;

    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)?;
    Ok(buffer)
}

/// `<stem>.<ext>`, а если такой файл уже есть (два запуска в одну секунду) - `<stem>_<n>.<ext>`
fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.{}", stem, extension));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.{}", stem, n, extension));
        n += 1;
    }
    path
}

fn write_artifact(path: &Path, content: &[u8]) -> Result<()> {
    File::create(path)
        .and_then(|mut file| file.write_all(content))
        .map_err(|source| PipelineError::Export {
            path: path.to_path_buf(),
            source,
        })
}

/// Текст заголовка: константа на каждый коэффициент и параметры стандартизации,
/// без которых коэффициенты на устройстве неприменимы.
pub fn render_firmware_header(rows: &[(String, f64)], scaler: &StandardScaler) -> String {
    let mut out = String::new();
    out.push_str(&format!("#ifndef {}\n", HEADER_GUARD));
    out.push_str(&format!("#define {}\n\n", HEADER_GUARD));

    for (name, value) in rows {
        out.push_str(&format!("const float {} = {:.6};\n", name, value));
    }

    if let (Some(mean), Some(std)) = (scaler.mean(), scaler.std()) {
        out.push('\n');
        for ((name, m), s) in FEATURE_NAMES.iter().zip(mean.iter()).zip(std.iter()) {
            out.push_str(&format!("const float {}_mean = {:.6};\n", name, m));
            out.push_str(&format!("const float {}_scale = {:.6};\n", name, s));
        }
    }

    out.push_str("\n#endif");
    out
}
