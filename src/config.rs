//! Параметры запуска обучения

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::{ModelFamily, DEFAULT_SEED};
use crate::preprocessing::split::validate_test_size;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_model")]
    pub model: ModelFamily,
    #[serde(default = "default_test_size")]
    pub test_size: f64, // доля тестовой выборки, (0, 1)
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Писать данные для диагностических графиков
    #[serde(default)]
    pub diagnostics: bool,
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: PathBuf,
}

fn default_data_path() -> PathBuf { PathBuf::from("data/training") }
fn default_model() -> ModelFamily { ModelFamily::Linear }
fn default_test_size() -> f64 { 0.2 }
fn default_seed() -> u64 { DEFAULT_SEED }
fn default_output_dir() -> PathBuf { PathBuf::from("models/production") }
fn default_diagnostics_dir() -> PathBuf { PathBuf::from(".") }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            model: default_model(),
            test_size: default_test_size(),
            seed: default_seed(),
            output_dir: default_output_dir(),
            diagnostics: false,
            diagnostics_dir: default_diagnostics_dir(),
        }
    }
}

impl PipelineConfig {
    /// Читает JSON-файл, отсутствующие поля получают значения по умолчанию
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_test_size(self.test_size)?;
        if self.output_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config("output directory must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.model, ModelFamily::Linear);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.output_dir, PathBuf::from("models/production"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"model": "gradient_boosting", "test_size": 0.3}"#).unwrap();
        assert_eq!(config.model, ModelFamily::GradientBoosting);
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.data_path, PathBuf::from("data/training"));
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_unknown_model_in_json_is_rejected() {
        assert!(serde_json::from_str::<PipelineConfig>(r#"{"model": "svm"}"#).is_err());
    }

    #[test]
    fn test_validate_test_size() {
        let config = PipelineConfig {
            test_size: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }
}
