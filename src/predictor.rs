use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::{BinaryClassifier, ForestError, DECISION_THRESHOLD};
use crate::data::{FeatureRow, FeatureTables, RawTables};
use crate::store::ModelStore;
use crate::trainer::{MissingColumn, Task, TrainedModel};

/// Confidence bucket of a positive-class probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// `> 0.7` high, `> 0.4` medium, otherwise low
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.7 {
            Confidence::High
        } else if probability > 0.4 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Classifier output for one driver or constructor row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub entity_id: i64,
    pub entity_name: String,
    pub label: u8,
    pub probability: f64,
    pub confidence: Confidence,
}

impl PredictionResult {
    pub fn is_positive(&self) -> bool {
        self.label == 1
    }
}

/// Ranked title predictions for one season
#[derive(Debug, Clone, Default)]
pub struct ChampionshipPredictions {
    pub year: i32,
    /// Feature season the rows were taken from
    pub snapshot_season: Option<i32>,
    pub drivers: Vec<PredictionResult>,
    pub constructors: Vec<PredictionResult>,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0} model is not loaded")]
    ModelNotLoaded(Task),

    #[error("{task} rows: {source}")]
    MissingColumn {
        task: Task,
        #[source]
        source: MissingColumn,
    },

    #[error("{task} classifier: {source}")]
    Classifier {
        task: Task,
        #[source]
        source: ForestError,
    },
}

/// Serves every loaded model. Models are read-only once loaded.
#[derive(Debug, Default)]
pub struct Predictor {
    models: BTreeMap<Task, TrainedModel>,
}

impl Predictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every task's artifact; tasks that fail to load are skipped
    pub fn load(store: &ModelStore) -> Self {
        let mut predictor = Self::new();
        for task in Task::ALL {
            match store.load(task) {
                Ok(model) => {
                    info!("Loaded {} model (trained {})", task, model.trained_at);
                    predictor.insert(model);
                }
                Err(e) => warn!("Failed to load {} model: {}", task, e),
            }
        }
        predictor
    }

    pub fn insert(&mut self, model: TrainedModel) {
        self.models.insert(model.task, model);
    }

    pub fn model(&self, task: Task) -> Option<&TrainedModel> {
        self.models.get(&task)
    }

    pub fn is_loaded(&self, task: Task) -> bool {
        self.models.contains_key(&task)
    }

    pub fn loaded_tasks(&self) -> Vec<Task> {
        self.models.keys().copied().collect()
    }

    /// Predict every row with the task's model, in input order
    pub fn predict<R: FeatureRow>(
        &self,
        task: Task,
        rows: &[R],
        tables: &RawTables,
    ) -> Result<Vec<PredictionResult>, PredictError> {
        let model = self.model(task).ok_or(PredictError::ModelNotLoaded(task))?;
        let x = model
            .transform(rows)
            .map_err(|source| PredictError::MissingColumn { task, source })?;

        rows.iter()
            .zip(x.rows())
            .map(|(row, features)| {
                let probability = model
                    .classifier
                    .predict_proba(features)
                    .map_err(|source| PredictError::Classifier { task, source })?;
                let entity_id = row.entity_id();
                let entity_name = match task {
                    Task::Constructors => tables.constructor_name(entity_id),
                    _ => tables.driver_name(entity_id),
                };

                Ok(PredictionResult {
                    entity_id,
                    entity_name,
                    label: u8::from(probability >= DECISION_THRESHOLD),
                    probability,
                    confidence: Confidence::from_probability(probability),
                })
            })
            .collect()
    }

    /// Predict one row
    pub fn predict_one<R: FeatureRow>(
        &self,
        task: Task,
        row: R,
        tables: &RawTables,
    ) -> Result<PredictionResult, PredictError> {
        let mut results = self.predict(task, std::slice::from_ref(&row), tables)?;
        // One row in, one result out
        Ok(results.remove(0))
    }

    /// Drivers' and constructors' title predictions for `year`.
    ///
    /// No features exist for a future season, so the rows of the snapshot
    /// season (`snapshot_season`, else the latest feature season) are reused
    /// with their season set to `year`. Results are ranked by probability.
    pub fn predict_championships(
        &self,
        year: i32,
        features: &FeatureTables,
        snapshot_season: Option<i32>,
        tables: &RawTables,
    ) -> Result<ChampionshipPredictions, PredictError> {
        for task in [Task::Wdc, Task::Constructors] {
            if !self.is_loaded(task) {
                return Err(PredictError::ModelNotLoaded(task));
            }
        }

        let Some(snapshot) = snapshot_season.or_else(|| features.latest_season()) else {
            warn!("No feature rows available for championship prediction");
            return Ok(ChampionshipPredictions {
                year,
                ..Default::default()
            });
        };

        let mut driver_rows = features.drivers_in_season(snapshot);
        for row in &mut driver_rows {
            row.season = year;
        }
        let mut constructor_rows = features.constructors_in_season(snapshot);
        for row in &mut constructor_rows {
            row.season = year;
        }

        let mut drivers = self.predict(Task::Wdc, &driver_rows, tables)?;
        let mut constructors = self.predict(Task::Constructors, &constructor_rows, tables)?;
        rank(&mut drivers);
        rank(&mut constructors);

        Ok(ChampionshipPredictions {
            year,
            snapshot_season: Some(snapshot),
            drivers,
            constructors,
        })
    }
}

/// Highest probability first; equal probabilities keep id order
fn rank(results: &mut [PredictionResult]) {
    results.sort_by(|a, b| b.probability.total_cmp(&a.probability));
}
