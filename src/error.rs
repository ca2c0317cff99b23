use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

use crate::analytics::LookupError;
use crate::models::ErrorResponse;
use crate::predictor::PredictError;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Unknown driver, constructor or season
    NotFound(String),
    /// Model missing or inference failure
    PredictionError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PredictionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::NotFound(msg) => ("not_found", msg.clone()),
            AppError::PredictionError(msg) => ("prediction_error", msg.clone()),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: error_code.to_string(),
            message,
        })
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        AppError::NotFound(err.to_string())
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        AppError::PredictionError(err.to_string())
    }
}

/// Validation functions
pub fn require_driver(known: bool, driver_id: i64) -> Result<(), AppError> {
    if !known {
        return Err(AppError::NotFound(format!("Driver {} not found", driver_id)));
    }
    Ok(())
}

pub fn require_constructor(known: bool, constructor_id: i64) -> Result<(), AppError> {
    if !known {
        return Err(AppError::NotFound(format!(
            "Constructor {} not found",
            constructor_id
        )));
    }
    Ok(())
}
