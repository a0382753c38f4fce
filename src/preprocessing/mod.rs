/// Модуль предобработки данных

pub mod cleaning;
pub mod feature_engineering;
pub mod normalization;
pub mod preprocessor;
pub mod split;
pub mod statistics;

pub use feature_engineering::FeatureEngineer;
pub use normalization::StandardScaler;
pub use preprocessor::Preprocessor;
pub use split::{train_test_split, TrainTestSplit};
