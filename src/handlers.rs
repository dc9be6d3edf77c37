use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;

use crate::classifier::{self, Classifier, NUM_CLASSES};
use crate::error::{Result, ServiceError};
use crate::models::{HealthResponse, PixelInput, PredictionRequest, PredictionResponse};
use crate::preprocess;

pub const HEALTH_MESSAGE: &str = "MNIST model is live and ready!";

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Shared, read-only state: the model loaded at startup.
pub struct AppState {
    classifier: Arc<dyn Classifier>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

/// Registers every route of the inference service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::resource("/").route(web::get().to(health)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/predict/image").route(web::post().to(predict_image)));
}

/// Malformed JSON bodies are client errors with the usual error envelope.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServiceError::InvalidRequest(err.to_string()).into())
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        message: HEALTH_MESSAGE.to_string(),
    })
}

pub async fn predict(
    state: web::Data<AppState>,
    body: web::Json<PredictionRequest>,
) -> Result<HttpResponse> {
    let PredictionRequest { pixels, true_label } = body.into_inner();

    if let Some(label) = true_label {
        if usize::from(label) >= NUM_CLASSES {
            return Err(ServiceError::InvalidRecord(format!(
                "true_label {label} is not a digit 0-9"
            )));
        }
    }

    let prediction = run_inference(&state, pixels).await?;
    log::debug!(
        "Predicted {} ({}%), true_label={:?}",
        prediction.predicted,
        prediction.confidence,
        true_label
    );

    Ok(HttpResponse::Ok().json(prediction))
}

/// Accepts a drawing as a multipart upload and converts it to pixels here.
pub async fn predict_image(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut upload = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;

        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;
            if upload.len() + data.len() > MAX_UPLOAD_BYTES {
                return Err(ServiceError::InvalidImage(format!(
                    "upload exceeds {MAX_UPLOAD_BYTES} bytes"
                )));
            }
            upload.extend_from_slice(&data);
        }

        // the first non-empty part is the drawing
        if !upload.is_empty() {
            break;
        }
    }

    if upload.is_empty() {
        return Err(ServiceError::InvalidImage("no drawing uploaded".into()));
    }

    let pixels = web::block(move || preprocess::decode_drawing(&upload))
        .await
        .map_err(|e| ServiceError::Inference(e.to_string()))??;

    let prediction = run_inference(&state, pixels).await?;
    log::debug!(
        "Predicted {} ({}%) from uploaded drawing",
        prediction.predicted,
        prediction.confidence
    );

    Ok(HttpResponse::Ok().json(prediction))
}

/// Runs the forward pass on the blocking pool.
async fn run_inference(state: &AppState, pixels: PixelInput) -> Result<PredictionResponse> {
    let model = Arc::clone(&state.classifier);
    web::block(move || classifier::predict(model.as_ref(), pixels))
        .await
        .map_err(|e| ServiceError::Inference(e.to_string()))?
}
