/// CLI обучения модели глюкозы

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use glucose_trainer::{
    pipeline, ConsoleReporter, DiagnosticsReporter, ModelFamily, PipelineConfig, Reporter,
};

#[derive(Parser, Debug)]
#[command(name = "glucose-trainer", version, about = "Train a glucose prediction model from PPG features")]
struct Cli {
    /// CSV file or directory of CSV files [default: data/training]
    #[arg(long)]
    data: Option<PathBuf>,

    /// linear | random_forest | gradient_boosting [default: linear]
    #[arg(long)]
    model: Option<ModelFamily>,

    /// Fraction of rows held out for evaluation [default: 0.2]
    #[arg(long)]
    test_size: Option<f64>,

    /// Directory for exported artifacts [default: models/production]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Seed for the split and the ensembles [default: 42]
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file, flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write diagnostic plot data
    #[arg(long)]
    diagnostics: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.diagnostics {
            config.diagnostics = true;
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glucose_trainer=info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    tracing::info!(
        "Training {} on {} (test size {}, seed {})",
        config.model,
        config.data_path.display(),
        config.test_size,
        config.seed
    );

    let reporter: Box<dyn Reporter> = if config.diagnostics {
        Box::new(DiagnosticsReporter::new(ConsoleReporter, config.diagnostics_dir.clone()))
    } else {
        Box::new(ConsoleReporter)
    };

    let outcome = pipeline::run(&config, reporter.as_ref()).context("Training pipeline failed")?;

    tracing::info!("Model exported to {}", outcome.artifact.primary.display());
    if !outcome.artifact.deployable {
        tracing::warn!(
            "{} is not directly deployable to the microcontroller",
            config.model.display_name()
        );
    }

    Ok(())
}
