use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use paddock::handlers;
use paddock::{AppConfig, AppContext};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {}", e);
    }

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let addr = config.bind_addr();

    info!("Loading data from {:?}", config.data_dir);
    let context = AppContext::load(config).map_err(|e| {
        error!("Failed to load data: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    let loaded = context.predictor.loaded_tasks();
    if loaded.is_empty() {
        warn!(
            "No models found in {:?}; prediction endpoints will fail until `paddock train` is run",
            context.config.model_dir
        );
    } else {
        info!("Models loaded: {:?}", loaded);
    }

    let app_state = Arc::new(context);

    info!("Starting Paddock API server at http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&addr)?
    .run()
    .await
}
