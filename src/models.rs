use serde::{Deserialize, Serialize};

use crate::data::{PodiumSample, SeasonPointsSample};
use crate::predictor::{ChampionshipPredictions, Confidence, PredictionResult};
use crate::trainer::Task;

/// Podium prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodiumRequest {
    #[serde(rename = "driverId")]
    pub driver_id: i64,
    #[serde(rename = "constructorId")]
    pub constructor_id: i64,
    pub grid: i64,
}

impl PodiumRequest {
    /// Unlabelled sample for the podium model
    pub fn to_sample(&self) -> PodiumSample {
        PodiumSample {
            driver_id: self.driver_id,
            constructor_id: self.constructor_id,
            grid: self.grid,
            is_podium: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PodiumResponse {
    pub prediction: u8,
    pub podium_probability: f64,
    pub confidence: Confidence,
}

/// Drivers' title request from a driver's season points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WdcRequest {
    pub year: i32,
    #[serde(rename = "driverId")]
    pub driver_id: i64,
    pub points: f64,
}

impl WdcRequest {
    pub fn to_sample(&self) -> SeasonPointsSample {
        SeasonPointsSample {
            season: self.year,
            driver_id: self.driver_id,
            points: self.points,
            is_champion: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WdcResponse {
    pub prediction: u8,
    pub champion_probability: f64,
    pub driver_name: String,
    pub confidence: Confidence,
}

/// Optional `?driverId=` filter
#[derive(Debug, Default, Deserialize)]
pub struct DriverFilter {
    #[serde(rename = "driverId")]
    pub driver_id: Option<i64>,
}

/// Optional `?constructorId=` filter
#[derive(Debug, Default, Deserialize)]
pub struct ConstructorFilter {
    #[serde(rename = "constructorId")]
    pub constructor_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverChampionPrediction {
    pub driver_id: i64,
    pub driver_name: String,
    pub predicted_champion: bool,
    pub champion_probability: f64,
    pub confidence: Confidence,
}

impl From<PredictionResult> for DriverChampionPrediction {
    fn from(result: PredictionResult) -> Self {
        Self {
            driver_id: result.entity_id,
            predicted_champion: result.is_positive(),
            driver_name: result.entity_name,
            champion_probability: result.probability,
            confidence: result.confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorChampionPrediction {
    pub constructor_id: i64,
    pub constructor_name: String,
    pub predicted_champion: bool,
    pub champion_probability: f64,
    pub confidence: Confidence,
}

impl From<PredictionResult> for ConstructorChampionPrediction {
    fn from(result: PredictionResult) -> Self {
        Self {
            constructor_id: result.entity_id,
            predicted_champion: result.is_positive(),
            constructor_name: result.entity_name,
            champion_probability: result.probability,
            confidence: result.confidence,
        }
    }
}

/// Ranked predictions with the favourite repeated as `top_prediction`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionshipTable<T> {
    pub predictions: Vec<T>,
    pub top_prediction: Option<T>,
}

impl<T: Clone> ChampionshipTable<T> {
    pub fn new(predictions: Vec<T>) -> Self {
        let top_prediction = predictions.first().cloned();
        Self {
            predictions,
            top_prediction,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChampionshipsResponse {
    pub world_drivers_championship: ChampionshipTable<DriverChampionPrediction>,
    pub constructors_championship: ChampionshipTable<ConstructorChampionPrediction>,
}

impl From<ChampionshipPredictions> for ChampionshipsResponse {
    fn from(predictions: ChampionshipPredictions) -> Self {
        Self {
            world_drivers_championship: ChampionshipTable::new(
                predictions.drivers.into_iter().map(Into::into).collect(),
            ),
            constructors_championship: ChampionshipTable::new(
                predictions.constructors.into_iter().map(Into::into).collect(),
            ),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models_loaded: Vec<Task>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
