use std::path::Path;

use ndarray::Array4;
use tract_onnx::prelude::*;

use crate::error::{Result, ServiceError};
use crate::models::{PixelInput, PredictionResponse};
use crate::preprocess::{self, IMAGE_SIDE};

pub const NUM_CLASSES: usize = 10;

/// A loaded digit model. Implementations are read-only after construction
/// and shared across request threads.
pub trait Classifier: Send + Sync {
    /// One forward pass over a normalized `1x1x28x28` input, returning the
    /// raw logits.
    fn logits(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

/// Classifier backed by an ONNX artifact (quantized ops are handled by tract).
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ServiceError::Model(format!(
                "model artifact not found at {}",
                path.display()
            )));
        }

        let side = IMAGE_SIDE;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| ServiceError::Model(format!("failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, 1, side, side]).into())
            .map_err(|e| ServiceError::Model(format!("unexpected model input: {e}")))?
            .into_optimized()
            .map_err(|e| ServiceError::Model(format!("failed to optimize ONNX model: {e}")))?
            .into_runnable()
            .map_err(|e| ServiceError::Model(format!("failed to make model runnable: {e}")))?;

        log::info!("Loaded model from {}", path.display());
        Ok(Self { model })
    }
}

impl Classifier for OnnxClassifier {
    fn logits(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let values = input
            .as_slice()
            .ok_or_else(|| ServiceError::Inference("input tensor is not contiguous".into()))?;
        let tensor = tract_ndarray::Array::from_shape_vec(
            (1, 1, IMAGE_SIDE, IMAGE_SIDE),
            values.to_vec(),
        )
        .map_err(|e| ServiceError::Inference(e.to_string()))?
        .into_tensor();

        let result = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| ServiceError::Inference(format!("model run failed: {e}")))?;

        let output = result[0]
            .to_array_view::<f32>()
            .map_err(|e| ServiceError::Inference(format!("unexpected model output: {e}")))?;
        Ok(output.iter().copied().collect())
    }
}

/// Numerically stable softmax in f32.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (index, &value)| match best {
            Some((_, top)) if value <= top => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}

/// Rounds to one decimal place on the exact binary value, ties to even.
pub fn round_tenths(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Probability as a percentage rounded to one decimal place.
pub fn to_percent(probability: f32) -> f64 {
    round_tenths(f64::from(probability) * 100.0)
}

/// Turns raw logits into a prediction.
pub fn decide(logits: &[f32]) -> Result<PredictionResponse> {
    if logits.len() != NUM_CLASSES {
        return Err(ServiceError::Inference(format!(
            "expected {NUM_CLASSES} logits, got {}",
            logits.len()
        )));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(ServiceError::Inference("model produced non-finite logits".into()));
    }

    let probs = softmax(logits);
    let predicted = argmax(&probs)
        .ok_or_else(|| ServiceError::Inference("empty model output".into()))?;

    Ok(PredictionResponse {
        predicted: predicted as u8,
        confidence: to_percent(probs[predicted]),
    })
}

/// Validate, normalize, run one forward pass and pick the top class.
pub fn predict(classifier: &dyn Classifier, pixels: PixelInput) -> Result<PredictionResponse> {
    let input = preprocess::prepare(pixels)?;
    let logits = classifier.logits(&input)?;
    decide(&logits)
}
