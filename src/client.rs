//! Client side of the service: calls the inference endpoint and keeps the
//! prediction log.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::classifier::round_tenths;
use crate::error::{Result, ServiceError};
use crate::models::{
    ErrorResponse, HealthResponse, PixelInput, PredictionRecord, PredictionRequest,
    PredictionResponse,
};
use crate::store::PredictionStore;

pub struct InferenceClient {
    client: Client,
    endpoint: Url,
}

impl InferenceClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ServiceError::InvalidRequest(format!("invalid endpoint URL '{endpoint}': {e}"))
        })?;

        let client = Client::builder()
            .user_agent(concat!("digit-client/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Liveness lives at the root of the endpoint's origin.
    pub fn health_url(&self) -> Result<Url> {
        self.endpoint
            .join("/")
            .map_err(|e| ServiceError::InvalidRequest(e.to_string()))
    }

    /// Sends raw `[0, 1]` intensities; the service normalizes them.
    pub fn predict(&self, pixels: PixelInput) -> Result<PredictionResponse> {
        let request = PredictionRequest {
            pixels,
            true_label: None,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()?;

        let mut prediction: PredictionResponse = read_json(response)?;
        prediction.confidence = round_tenths(prediction.confidence);
        Ok(prediction)
    }

    pub fn health(&self) -> Result<HealthResponse> {
        let response = self.client.get(self.health_url()?).send()?;
        read_json(response)
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json()?);
    }

    let body = response.text().unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.detail)
        .unwrap_or(body);
    Err(ServiceError::Remote {
        status: status.as_u16(),
        detail,
    })
}

/// Classifies a drawing and records it: one unlabeled row for the
/// prediction, then, if the user supplied ground truth, a second row
/// carrying the label.
pub fn classify_and_log(
    client: &InferenceClient,
    store: &PredictionStore,
    pixels: PixelInput,
    true_label: Option<u8>,
) -> Result<PredictionResponse> {
    let prediction = client.predict(pixels)?;
    store.log_prediction(prediction.predicted, prediction.confidence, None)?;

    if let Some(label) = true_label {
        store.log_prediction(prediction.predicted, prediction.confidence, Some(label))?;
    }

    Ok(prediction)
}

/// Renders the history window as a plain-text table.
pub fn format_history(records: &[PredictionRecord]) -> String {
    if records.is_empty() {
        return "No predictions with feedback yet.".to_string();
    }

    let mut out = format!(
        "{:>3}  {:<19}  {:>9}  {:>10}  {:>10}\n",
        "#", "Timestamp", "Predicted", "True Label", "Confidence"
    );
    for (index, record) in records.iter().enumerate() {
        let label = record
            .true_label
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>3}  {:<19}  {:>9}  {:>10}  {:>9.1}%\n",
            index + 1,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.predicted,
            label,
            record.confidence
        ));
    }
    out
}
