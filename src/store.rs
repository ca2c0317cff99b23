//! Model Store
//!
//! One JSON artifact per task (`<task>_model.json`) plus the fitted scaler for
//! tasks that standardize (`<task>_scaler.json`). Files are written to a
//! temporary sibling and renamed into place, scaler first, so a model file is
//! only ever replaced once its scaler is on disk.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::core::{scaler, RandomForest, StandardScaler};
use crate::trainer::{Task, TrainedModel};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found: {0:?}")]
    NotFound(PathBuf),

    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact for {expected} contains a {found} model")]
    TaskMismatch { expected: Task, found: Task },

    #[error("{task} model expects columns {expected:?}, artifact has {found:?}")]
    ColumnMismatch {
        task: Task,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{task} scaler has {found} columns, model has {expected}")]
    ScalerMismatch {
        task: Task,
        expected: usize,
        found: usize,
    },
}

/// On-disk form of a model without its scaler
#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    task: Task,
    feature_columns: Vec<String>,
    trained_at: DateTime<Utc>,
    classifier: RandomForest,
}

/// Directory holding the persisted models
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, task: Task) -> PathBuf {
        self.dir.join(format!("{}_model.json", task.name()))
    }

    pub fn scaler_path(&self, task: Task) -> PathBuf {
        self.dir.join(format!("{}_scaler.json", task.name()))
    }

    /// Persist a trained model, replacing any previous artifact for its task
    pub fn save(&self, model: &TrainedModel) -> Result<(), ModelError> {
        fs::create_dir_all(&self.dir).map_err(|source| ModelError::Io {
            path: self.dir.clone(),
            source,
        })?;

        if let Some(fitted) = &model.scaler {
            write_json(&self.scaler_path(model.task), fitted)?;
        }

        let artifact = ModelArtifact {
            task: model.task,
            feature_columns: model.feature_columns.clone(),
            trained_at: model.trained_at,
            classifier: model.classifier.clone(),
        };
        write_json(&self.model_path(model.task), &artifact)?;

        info!("Saved {} model to {:?}", model.task, self.model_path(model.task));
        Ok(())
    }

    /// Load and validate the artifact for a task
    pub fn load(&self, task: Task) -> Result<TrainedModel, ModelError> {
        let artifact: ModelArtifact = read_json(&self.model_path(task))?;

        if artifact.task != task {
            return Err(ModelError::TaskMismatch {
                expected: task,
                found: artifact.task,
            });
        }

        let expected: Vec<String> = task.feature_columns().iter().map(|c| c.to_string()).collect();
        if artifact.feature_columns != expected {
            return Err(ModelError::ColumnMismatch {
                task,
                expected,
                found: artifact.feature_columns,
            });
        }

        let scaler = if task.is_scaled() {
            let fitted: StandardScaler = read_json(&self.scaler_path(task))?;
            let found = scaler::n_features(&fitted);
            if found != expected.len() {
                return Err(ModelError::ScalerMismatch {
                    task,
                    expected: expected.len(),
                    found,
                });
            }
            Some(fitted)
        } else {
            None
        };

        Ok(TrainedModel {
            task,
            feature_columns: artifact.feature_columns,
            classifier: artifact.classifier,
            scaler,
            trained_at: artifact.trained_at,
        })
    }

    /// Tasks with a model artifact on disk
    pub fn available(&self) -> Vec<Task> {
        Task::ALL
            .into_iter()
            .filter(|&t| self.model_path(t).exists())
            .collect()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let json = serde_json::to_vec(value).map_err(|source| ModelError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    let io_err = |source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        io_err(source)
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ModelError::Json {
        path: path.to_path_buf(),
        source,
    })
}
