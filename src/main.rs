use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;

use digit_serve::config::ServerArgs;
use digit_serve::handlers::{self, AppState};
use digit_serve::OnnxClassifier;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    digit_serve::init_logging();
    let args = ServerArgs::parse();

    // No model, no server.
    let classifier = OnnxClassifier::load(&args.model)
        .with_context(|| format!("refusing to start without model {}", args.model.display()))?;
    let state = web::Data::new(AppState::new(Arc::new(classifier)));

    log::info!("Server running at http://{}:{}", args.host, args.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind((args.host.as_str(), args.port))
    .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?
    .run()
    .await?;

    Ok(())
}
