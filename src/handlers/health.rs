use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::context::AppContext;
use crate::models::HealthResponse;

/// Health check endpoint
pub async fn health_check(state: web::Data<Arc<AppContext>>) -> impl Responder {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models_loaded: state.predictor.loaded_tasks(),
    };

    HttpResponse::Ok().json(response)
}
