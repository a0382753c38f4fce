//! Glucose Trainer - обучение модели глюкозы по признакам PPG

pub mod config;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod types;

pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use evaluation::{evaluate, ClarkeZone, EvaluationResult};
pub use export::{export_model, ExportedArtifact};
pub use loader::load_dataset;
pub use pipeline::{run, PipelineOutcome};
pub use report::{ConsoleReporter, DiagnosticsReporter, NullReporter, Reporter};
