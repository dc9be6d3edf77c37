use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Pixel payload as sent by clients: 784 flat values or a 28x28 grid.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PixelInput {
    Flat(Vec<f32>),
    Grid(Vec<Vec<f32>>),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredictionRequest {
    pub pixels: PixelInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_label: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PredictionResponse {
    pub predicted: u8,
    /// Percentage, one decimal place
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub detail: String,
}

/// One row of the prediction log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionRecord {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub predicted: u8,
    pub confidence: f64,
    pub true_label: Option<u8>,
}
