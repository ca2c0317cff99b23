//! Application context shared read-only by every request handler

use tracing::info;

use crate::analytics::Analytics;
use crate::config::AppConfig;
use crate::data::{DataError, FeatureTables, RawTables, ResultHistoryIndex};
use crate::predictor::Predictor;
use crate::store::ModelStore;

/// Everything loaded once at startup
#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub tables: RawTables,
    pub features: FeatureTables,
    pub history: ResultHistoryIndex,
    pub predictor: Predictor,
}

impl AppContext {
    /// Load raw tables, build features and load whatever models exist
    pub fn load(config: AppConfig) -> Result<Self, DataError> {
        let tables = RawTables::load(&config.data_dir)?;
        let predictor = Predictor::load(&ModelStore::new(&config.model_dir));
        Ok(Self::new(config, tables, predictor))
    }

    pub fn new(config: AppConfig, tables: RawTables, predictor: Predictor) -> Self {
        let features = FeatureTables::build(&tables);
        let history = ResultHistoryIndex::build(&tables);
        info!(
            "Built {} driver and {} constructor feature rows, {} drivers indexed",
            features.drivers.len(),
            features.constructors.len(),
            history.driver_count()
        );

        Self {
            config,
            tables,
            features,
            history,
            predictor,
        }
    }

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics::new(&self.tables, &self.history)
    }

    /// End of the active-entity window: configured, else the latest race year
    pub fn reference_year(&self) -> Option<i32> {
        self.config
            .reference_year
            .or_else(|| self.tables.latest_season())
    }

    pub fn snapshot_season(&self) -> Option<i32> {
        self.config
            .snapshot_season
            .or_else(|| self.features.latest_season())
    }
}
