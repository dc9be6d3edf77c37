//! Handwritten digit classification: an inference service, its client, and
//! the prediction log the client keeps.

pub mod classifier;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod preprocess;
pub mod store;

pub use classifier::{Classifier, OnnxClassifier};
pub use error::{Result, ServiceError};
pub use models::{PixelInput, PredictionRecord, PredictionRequest, PredictionResponse};
pub use store::PredictionStore;

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
