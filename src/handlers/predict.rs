use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::debug;

use crate::context::AppContext;
use crate::error::{require_constructor, require_driver, AppError};
use crate::models::{
    ChampionshipsResponse, PodiumRequest, PodiumResponse, WdcRequest, WdcResponse,
};
use crate::trainer::Task;

/// Predict whether a driver finishes on the podium from a grid slot
pub async fn predict_podium(
    state: web::Data<Arc<AppContext>>,
    req: web::Json<PodiumRequest>,
) -> Result<HttpResponse, AppError> {
    require_driver(state.tables.driver(req.driver_id).is_some(), req.driver_id)?;
    require_constructor(
        state.tables.constructor(req.constructor_id).is_some(),
        req.constructor_id,
    )?;

    let result = state
        .predictor
        .predict_one(Task::Podium, req.to_sample(), &state.tables)?;

    Ok(HttpResponse::Ok().json(PodiumResponse {
        prediction: result.label,
        podium_probability: result.probability,
        confidence: result.confidence,
    }))
}

/// Predict whether a driver's season points win the drivers' title
pub async fn predict_wdc(
    state: web::Data<Arc<AppContext>>,
    req: web::Json<WdcRequest>,
) -> Result<HttpResponse, AppError> {
    require_driver(state.tables.driver(req.driver_id).is_some(), req.driver_id)?;

    let result = state
        .predictor
        .predict_one(Task::WdcPoints, req.to_sample(), &state.tables)?;

    Ok(HttpResponse::Ok().json(WdcResponse {
        prediction: result.label,
        champion_probability: result.probability,
        driver_name: result.entity_name,
        confidence: result.confidence,
    }))
}

/// Ranked drivers' and constructors' title predictions for a season
pub async fn predict_championships(
    state: web::Data<Arc<AppContext>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let year = path.into_inner();
    let predictions = state.predictor.predict_championships(
        year,
        &state.features,
        state.snapshot_season(),
        &state.tables,
    )?;
    debug!(
        "Championship predictions for {} from {:?} snapshot",
        year, predictions.snapshot_season
    );

    Ok(HttpResponse::Ok().json(ChampionshipsResponse::from(predictions)))
}

/// Heuristic outlook for a driver's season
pub async fn project_driver(
    state: web::Data<Arc<AppContext>>,
    path: web::Path<(i64, i32)>,
) -> Result<HttpResponse, AppError> {
    let (driver_id, year) = path.into_inner();
    let projection = state.analytics().project_driver(driver_id, year)?;
    Ok(HttpResponse::Ok().json(projection))
}

/// Heuristic outlook for a constructor's season
pub async fn project_constructor(
    state: web::Data<Arc<AppContext>>,
    path: web::Path<(i64, i32)>,
) -> Result<HttpResponse, AppError> {
    let (constructor_id, year) = path.into_inner();
    let projection = state.analytics().project_constructor(constructor_id, year)?;
    Ok(HttpResponse::Ok().json(projection))
}
