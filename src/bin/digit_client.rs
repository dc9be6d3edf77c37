//! Command-line client: classify drawings, record feedback, show history.

use anyhow::Context;
use clap::Parser;

use digit_serve::client::{self, InferenceClient};
use digit_serve::config::{ClientArgs, ClientCommand};
use digit_serve::{preprocess, PredictionStore};

fn main() -> anyhow::Result<()> {
    digit_serve::init_logging();
    let args = ClientArgs::parse();

    match args.command {
        ClientCommand::Predict { image, label } => {
            let store = PredictionStore::open(&args.db)
                .with_context(|| format!("failed to open prediction log {}", args.db.display()))?;
            let inference = InferenceClient::new(&args.endpoint)?;

            let drawing = image::open(&image)
                .with_context(|| format!("failed to read drawing {}", image.display()))?;
            let pixels = preprocess::drawing_to_pixels(&drawing);

            let prediction = client::classify_and_log(&inference, &store, pixels, label)
                .context("failed to get prediction from API")?;

            println!("Prediction: {}", prediction.predicted);
            println!("Confidence: {:.1}%", prediction.confidence);
            if label.is_some() {
                println!("Feedback submitted.");
            }
        }
        ClientCommand::History { limit } => {
            let store = PredictionStore::open(&args.db)
                .with_context(|| format!("failed to open prediction log {}", args.db.display()))?;
            let records = store
                .get_recent_predictions(limit)
                .context("failed to load logs")?;
            println!("{}", client::format_history(&records).trim_end());
        }
        ClientCommand::Health => {
            let inference = InferenceClient::new(&args.endpoint)?;
            let health = inference
                .health()
                .with_context(|| format!("inference service at {} is not reachable", inference.endpoint()))?;
            println!("{}: {}", health.status, health.message);
        }
    }

    Ok(())
}
