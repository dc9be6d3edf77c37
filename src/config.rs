//! Command-line and environment configuration for both binaries.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::store::DEFAULT_HISTORY_LIMIT;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/predict";

/// Handwritten digit inference service
#[derive(Parser, Debug)]
#[command(name = "digit-serve")]
#[command(version)]
#[command(about = "HTTP inference service for handwritten digits")]
pub struct ServerArgs {
    /// Host to bind to
    #[arg(long, env = "DIGIT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "DIGIT_PORT", default_value_t = 8080)]
    pub port: u16,

    /// ONNX model artifact; the server will not start without it
    #[arg(short, long, env = "DIGIT_MODEL_PATH")]
    pub model: PathBuf,
}

/// Draw-and-log client for the digit inference service
#[derive(Parser, Debug)]
#[command(name = "digit-client")]
#[command(version)]
#[command(about = "Classify drawings and keep a prediction log")]
pub struct ClientArgs {
    /// Prediction endpoint URL
    #[arg(long, env = "PREDICTION_API_URL", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// SQLite file holding the prediction log
    #[arg(long, env = "DIGIT_DB_PATH", default_value = "predictions.db")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ClientCommand {
    /// Classify a drawing and log the result
    Predict {
        /// Image file with a white digit on a black background
        image: PathBuf,

        /// Ground-truth digit, logged as feedback
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
        label: Option<u8>,
    },
    /// Show the most recent predictions that carry a label
    History {
        #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Check that the inference service is up
    Health,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_requires_model_path() {
        let args = ServerArgs::try_parse_from(["digit-serve", "--model", "mnist.onnx"]).unwrap();
        assert_eq!(args.model, PathBuf::from("mnist.onnx"));
        assert_eq!(args.port, 8080);
        assert_eq!(args.host, "127.0.0.1");

        let args =
            ServerArgs::try_parse_from(["digit-serve", "-m", "m.onnx", "-p", "9000"]).unwrap();
        assert_eq!(args.port, 9000);
    }

    #[test]
    fn client_parses_predict_with_label() {
        let args = ClientArgs::try_parse_from([
            "digit-client",
            "--db",
            "/tmp/log.db",
            "predict",
            "seven.png",
            "--label",
            "7",
        ])
        .unwrap();
        assert_eq!(args.db, PathBuf::from("/tmp/log.db"));
        assert_eq!(
            args.command,
            ClientCommand::Predict {
                image: PathBuf::from("seven.png"),
                label: Some(7),
            }
        );
    }

    #[test]
    fn client_rejects_label_outside_digits() {
        let result =
            ClientArgs::try_parse_from(["digit-client", "predict", "x.png", "--label", "12"]);
        assert!(result.is_err());
    }

    #[test]
    fn history_limit_defaults_to_ten() {
        let args = ClientArgs::try_parse_from(["digit-client", "history"]).unwrap();
        assert_eq!(args.command, ClientCommand::History { limit: 10 });
    }
}
