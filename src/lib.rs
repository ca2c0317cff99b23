//! Paddock - motorsport championship and podium prediction system
//!
//! This library provides:
//! - CSV loading of race results, standings and reference tables
//! - Per-season driver and constructor feature engineering
//! - Random forests of linfa decision trees for podium and championship prediction
//! - Historical analytics and trailing-window performance projections
//! - HTTP handlers over a shared application context (`api` feature)
//!
//! # Example
//!
//! ```no_run
//! use paddock::data::{FeatureTables, RawTables};
//! use paddock::trainer::{train, Task};
//!
//! let tables = RawTables::load("data")?;
//! let features = FeatureTables::build(&tables);
//! let (model, report) = train(Task::Wdc, &features.drivers)?;
//! println!("accuracy: {:.3}", report.test_metrics.accuracy);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analytics;
pub mod config;
pub mod context;
pub mod core;
pub mod data;
pub mod models;
pub mod predictor;
pub mod store;
pub mod trainer;

// API-specific modules (only available with api feature)
#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod handlers;

// Re-export commonly used types
pub use analytics::Analytics;
pub use config::AppConfig;
pub use context::AppContext;
pub use data::{FeatureTables, RawTables};
pub use predictor::{Confidence, PredictionResult, Predictor};
pub use store::ModelStore;
pub use trainer::{train, Task, TrainedModel, TrainingReport};
