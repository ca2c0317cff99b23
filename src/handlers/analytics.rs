use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::context::AppContext;
use crate::models::{ConstructorFilter, DriverFilter};

/// Mean points per season for each driver
pub async fn driver_performance(
    state: web::Data<Arc<AppContext>>,
    query: web::Query<DriverFilter>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.analytics().driver_performance(query.driver_id))
}

/// Total points per season for each constructor
pub async fn team_standings(
    state: web::Data<Arc<AppContext>>,
    query: web::Query<ConstructorFilter>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.analytics().team_standings(query.constructor_id))
}

/// Podium finishes per season for each driver
pub async fn podium_frequency(
    state: web::Data<Arc<AppContext>>,
    query: web::Query<DriverFilter>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.analytics().podium_frequency(query.driver_id))
}
