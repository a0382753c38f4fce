//! Загрузка CSV-файлов с парами PPG-признаков и эталонной глюкозы

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::preprocessing::statistics::describe;
use crate::types::{ColumnSummary, Dataset, RawRecord, REQUIRED_COLUMNS};

const CSV_EXTENSION: &str = "csv";

/// Текстовые обозначения пропуска, как их понимает pandas
pub const NULL_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Записи одного файла вместе с набором его колонок
struct ParsedFile {
    records: Vec<Option<RawRecord>>,
    columns: BTreeSet<String>,
}

/// Загружает файл или все CSV-файлы каталога (без рекурсии).
///
/// В режиме каталога ошибка разбора отдельного файла только логируется,
/// загрузка падает, если не прочитан ни один файл. Одиночный файл
/// с ошибкой разбора является фатальной ошибкой.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let mut dataset = Dataset::default();
    let mut rows: Vec<Option<RawRecord>> = Vec::new();

    if path.is_dir() {
        for file in list_csv_files(path)? {
            match parse_csv(&file) {
                Ok(parsed) => {
                    tracing::info!("Loaded {} with {} records", file.display(), parsed.records.len());
                    dataset.columns.extend(parsed.columns);
                    rows.extend(parsed.records);
                    dataset.sources.push(file);
                }
                Err(e) => {
                    tracing::warn!("Error loading {}: {}", file.display(), e);
                    dataset.skipped.push(file);
                }
            }
        }

        if dataset.sources.is_empty() {
            return Err(PipelineError::NoValidFiles {
                path: path.to_path_buf(),
            });
        }
    } else {
        let parsed = parse_csv(path)?;
        tracing::info!("Loaded single file with {} records", parsed.records.len());
        dataset.columns = parsed.columns;
        rows = parsed.records;
        dataset.sources.push(path.to_path_buf());
    }

    validate_columns(&dataset.columns)?;

    let before = rows.len();
    let records = drop_duplicates(rows);
    dataset.records = records.into_iter().flatten().collect();
    tracing::debug!(
        "Dropped {} duplicate or glucose-less rows",
        before - dataset.records.len()
    );

    Ok(dataset)
}

/// Статистика по сырым колонкам (без учёта пропусков)
pub fn raw_summary(dataset: &Dataset) -> Vec<ColumnSummary> {
    let columns: [(&str, Vec<f64>); 4] = [
        ("ratio", dataset.records.iter().filter_map(|r| r.ratio).collect()),
        ("variability", dataset.records.iter().filter_map(|r| r.variability).collect()),
        ("slope", dataset.records.iter().filter_map(|r| r.slope).collect()),
        ("glucose", dataset.records.iter().map(|r| r.glucose).collect()),
    ];

    columns
        .iter()
        .filter_map(|(name, values)| describe(name, values))
        .collect()
}

fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == CSV_EXTENSION))
        .collect();

    // Порядок каталога не определён, сортируем для воспроизводимости
    files.sort();
    Ok(files)
}

fn parse_csv(path: &Path) -> Result<ParsedFile> {
    let to_parse_error = |e: PolarsError| PipelineError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let file = File::open(path).map_err(|e| PipelineError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let parse_opts = CsvParseOptions::default().with_null_values(Some(NullValues::AllColumns(
        NULL_TOKENS.iter().map(|token| token.to_string()).collect(),
    )));

    // Схема выводится по всему файлу, иначе поздний текст в числовой колонке
    // обнаруживается только при чтении
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse_opts)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(to_parse_error)?;

    let columns: BTreeSet<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let height = df.height();
    let timestamp = text_column(&df, "timestamp", height).map_err(to_parse_error)?;
    let ratio = float_column(&df, "ratio", height).map_err(to_parse_error)?;
    let variability = float_column(&df, "variability", height).map_err(to_parse_error)?;
    let slope = float_column(&df, "slope", height).map_err(to_parse_error)?;
    let glucose = float_column(&df, "glucose", height).map_err(to_parse_error)?;

    let records = (0..height)
        .map(|i| {
            // Без глюкозы запись бесполезна для обучения
            glucose[i].map(|glucose| RawRecord {
                timestamp: timestamp[i].clone(),
                ratio: ratio[i],
                variability: variability[i],
                slope: slope[i],
                glucose,
            })
        })
        .collect();

    Ok(ParsedFile { records, columns })
}

fn float_column(df: &DataFrame, name: &str, height: usize) -> PolarsResult<Vec<Option<f64>>> {
    if !has_column(df, name) {
        return Ok(vec![None; height]);
    }

    let series = df.column(name)?.strict_cast(&DataType::Float64)?;
    // inf и NaN, записанные числом, тоже считаются пропуском
    let values = series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

fn text_column(df: &DataFrame, name: &str, height: usize) -> PolarsResult<Vec<Option<String>>> {
    if !has_column(df, name) {
        return Ok(vec![None; height]);
    }

    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.to_string() == name)
}

fn validate_columns(columns: &BTreeSet<String>) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.contains(**c))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns(missing))
    }
}

/// Удаляет полные дубликаты, оставляя первое вхождение. Пропуск равен пропуску.
fn drop_duplicates(rows: Vec<Option<RawRecord>>) -> Vec<Option<RawRecord>> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(rows.len());

    for row in rows {
        // Строки без глюкозы отбрасываются позже, но в дедупликации участвуют как есть
        let key = row.as_ref().map(|r| {
            (
                r.timestamp.clone(),
                r.ratio.map(f64::to_bits),
                r.variability.map(f64::to_bits),
                r.slope.map(f64::to_bits),
                r.glucose.to_bits(),
            )
        });
        if key.is_none() || seen.insert(key) {
            unique.push(row);
        }
    }

    unique
}
