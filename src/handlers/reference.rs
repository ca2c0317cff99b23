use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::context::AppContext;

/// Drivers with a result inside the active window
pub async fn active_drivers(state: web::Data<Arc<AppContext>>) -> HttpResponse {
    let drivers = match state.reference_year() {
        Some(year) => state
            .analytics()
            .active_drivers(year, state.config.active_window_years),
        None => Vec::new(),
    };
    HttpResponse::Ok().json(drivers)
}

/// Constructors with a result inside the active window
pub async fn active_constructors(state: web::Data<Arc<AppContext>>) -> HttpResponse {
    let constructors = match state.reference_year() {
        Some(year) => state
            .analytics()
            .active_constructors(year, state.config.active_window_years),
        None => Vec::new(),
    };
    HttpResponse::Ok().json(constructors)
}

/// Race years, most recent first
pub async fn seasons(state: web::Data<Arc<AppContext>>) -> HttpResponse {
    HttpResponse::Ok().json(state.analytics().seasons())
}
