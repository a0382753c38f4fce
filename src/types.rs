/// Типы данных конвейера обучения

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Колонки, без которых загрузка не имеет смысла
pub const REQUIRED_COLUMNS: [&str; 5] = ["timestamp", "ratio", "variability", "slope", "glucose"];

/// Порядок признаков в матрице и в экспортируемых коэффициентах
pub const FEATURE_NAMES: [&str; 5] = ["ratio", "variability", "slope", "pulse_rate", "acdc_ratio"];

/// Одно наблюдение сенсора до импутации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: Option<String>,
    pub ratio: Option<f64>,
    pub variability: Option<f64>,
    pub slope: Option<f64>,
    pub glucose: f64, // mg/dL
}

/// Объединённый набор записей из одного или нескольких файлов
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<RawRecord>,
    pub columns: BTreeSet<String>,
    /// Успешно прочитанные файлы
    pub sources: Vec<PathBuf>,
    /// Файлы, пропущенные из-за ошибок разбора
    pub skipped: Vec<PathBuf>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Запись после импутации, фильтрации и вычисления производных признаков
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub timestamp: Option<String>,
    pub ratio: f64,
    pub variability: f64,
    pub slope: f64,
    pub glucose: f64,
    pub pulse_rate: f64,
    pub acdc_ratio: f64,
}

impl ProcessedRecord {
    /// Вектор признаков в порядке `FEATURE_NAMES`
    pub fn features(&self) -> [f64; 5] {
        [
            self.ratio,
            self.variability,
            self.slope,
            self.pulse_rate,
            self.acdc_ratio,
        ]
    }
}

/// Описательная статистика одной колонки (аналог describe)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}
