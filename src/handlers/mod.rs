//! HTTP handlers over a shared [`AppContext`](crate::context::AppContext)

pub mod analytics;
pub mod health;
pub mod predict;
pub mod reference;

use actix_web::web;

/// Register every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/predict/podium", web::post().to(predict::predict_podium))
        .route("/predict/wdc", web::post().to(predict::predict_wdc))
        .route(
            "/predict/{year}/championships",
            web::get().to(predict::predict_championships),
        )
        .route(
            "/predict/driver/{driver_id}/{year}",
            web::get().to(predict::project_driver),
        )
        .route(
            "/predict/constructor/{constructor_id}/{year}",
            web::get().to(predict::project_constructor),
        )
        .route("/analytics/drivers", web::get().to(analytics::driver_performance))
        .route("/analytics/teams", web::get().to(analytics::team_standings))
        .route("/analytics/podiums", web::get().to(analytics::podium_frequency))
        .route("/drivers", web::get().to(reference::active_drivers))
        .route("/constructors", web::get().to(reference::active_constructors))
        .route("/seasons", web::get().to(reference::seasons));
}
