//! Data loading and feature engineering modules

pub mod csv_loader;
pub mod features;
pub mod history;

// Re-export commonly used types
pub use csv_loader::{
    Circuit, Constructor, DataError, Driver, Race, RaceResult, RawTables, StandingSnapshot,
};
pub use features::{
    season_champions, FeatureEngineering, FeatureRow, FeatureTables, PodiumSample,
    SeasonConstructorFeatures, SeasonDriverFeatures, SeasonPointsSample, PODIUM_POSITIONS,
};
pub use history::{HistoricalResult, ResultHistoryIndex};
