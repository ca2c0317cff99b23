//! Model Trainer
//!
//! Fits one random forest per prediction task on labelled feature rows, holds
//! out a stratified test split and reports held-out and cross-validated scores.

use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::{
    fit_scaler, scaler, stratified_kfold, train_test_split, BinaryClassifier, ClassWeight,
    ClassificationMetrics, CrossValidationScore, ForestConfig, ForestError, RandomForest,
    ScalerError, SplitError, StandardScaler,
};
use crate::data::{FeatureEngineering, FeatureRow, FeatureTables, RawTables};

/// Share of rows held out for evaluation
pub const TEST_SIZE: f64 = 0.2;
/// Folds used for the cross-validation estimate
pub const CV_FOLDS: usize = 5;
/// Seed for splitting and forest bootstrap
pub const RANDOM_SEED: u64 = 42;

const PODIUM_COLUMNS: [&str; 3] = ["driverId", "constructorId", "grid"];
const WDC_POINTS_COLUMNS: [&str; 3] = ["year", "driverId", "points"];
const WDC_COLUMNS: [&str; 10] = [
    "total_points",
    "avg_points",
    "max_points",
    "avg_position",
    "best_position",
    "avg_grid",
    "total_laps",
    "avg_laps",
    "seasons_experience",
    "age",
];
const CONSTRUCTORS_COLUMNS: [&str; 10] = [
    "total_points",
    "avg_points",
    "max_points",
    "avg_position",
    "best_position",
    "avg_grid",
    "total_laps",
    "avg_laps",
    "seasons_experience",
    "num_drivers",
];

/// Prediction tasks, each with its own feature set and artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Per-race podium finish from raw identifiers and grid slot
    Podium,
    /// Drivers' title from a driver's raw season points
    WdcPoints,
    /// Drivers' title from season aggregate features
    Wdc,
    /// Constructors' title from season aggregate features
    Constructors,
}

impl Task {
    pub const ALL: [Task; 4] = [Task::Podium, Task::WdcPoints, Task::Wdc, Task::Constructors];

    /// Artifact name
    pub fn name(self) -> &'static str {
        match self {
            Task::Podium => "podium",
            Task::WdcPoints => "wdc_points",
            Task::Wdc => "wdc",
            Task::Constructors => "constructors",
        }
    }

    /// Ordered feature columns fed to the classifier
    pub fn feature_columns(self) -> &'static [&'static str] {
        match self {
            Task::Podium => &PODIUM_COLUMNS,
            Task::WdcPoints => &WDC_POINTS_COLUMNS,
            Task::Wdc => &WDC_COLUMNS,
            Task::Constructors => &CONSTRUCTORS_COLUMNS,
        }
    }

    /// Whether features are standardized before fitting
    pub fn is_scaled(self) -> bool {
        matches!(self, Task::Wdc | Task::Constructors)
    }

    /// Championship tasks compensate for one winner per season
    pub fn class_weight(self) -> ClassWeight {
        match self {
            Task::Wdc | Task::Constructors => ClassWeight::Balanced,
            Task::Podium | Task::WdcPoints => ClassWeight::Uniform,
        }
    }

    pub fn forest_config(self) -> ForestConfig {
        ForestConfig::default()
            .with_class_weight(self.class_weight())
            .with_seed(RANDOM_SEED)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|t| t.name() == s.replace('-', "_"))
            .ok_or_else(|| format!("unknown task '{}'", s))
    }
}

/// A requested feature column the rows do not provide
#[derive(Debug, Error, PartialEq)]
#[error("missing feature column '{0}'")]
pub struct MissingColumn(pub String);

/// Training errors; all are fatal and leave no artifact behind
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("task {task}: {source}")]
    MissingColumn {
        task: Task,
        #[source]
        source: MissingColumn,
    },

    #[error("task {task}: {source}")]
    Data {
        task: Task,
        #[source]
        source: SplitError,
    },

    #[error("task {task}: {source}")]
    Scale {
        task: Task,
        #[source]
        source: ScalerError,
    },

    #[error("task {task}: {source}")]
    Fit {
        task: Task,
        #[source]
        source: ForestError,
    },
}

/// Project rows onto `columns`, in order
pub fn feature_matrix<R: FeatureRow>(rows: &[R], columns: &[&str]) -> Result<Array2<f64>, MissingColumn> {
    let mut x = Array2::<f64>::zeros((rows.len(), columns.len()));
    for (i, row) in rows.iter().enumerate() {
        for (j, column) in columns.iter().enumerate() {
            x[[i, j]] = row
                .feature(column)
                .ok_or_else(|| MissingColumn(column.to_string()))?;
        }
    }
    Ok(x)
}

/// Fitted classifier bound to its feature columns and optional scaler.
/// Never mutated after training; retraining produces a new one.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub task: Task,
    pub feature_columns: Vec<String>,
    pub classifier: RandomForest,
    pub scaler: Option<StandardScaler>,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Rows in this model's column order, scaled with the persisted scaler
    pub fn transform<R: FeatureRow>(&self, rows: &[R]) -> Result<Array2<f64>, MissingColumn> {
        let columns: Vec<&str> = self.feature_columns.iter().map(String::as_str).collect();
        let x = feature_matrix(rows, &columns)?;
        Ok(match &self.scaler {
            Some(fitted) => scaler::scale(fitted, &x),
            None => x,
        })
    }

    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Result<f64, ForestError> {
        self.classifier.predict_proba(row)
    }
}

/// Summary of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub task: Task,
    pub train_rows: usize,
    pub test_rows: usize,
    pub positives: usize,
    pub test_metrics: ClassificationMetrics,
    pub cross_validation: Option<CrossValidationScore>,
}

/// Train the task's classifier with its default configuration
pub fn train<R: FeatureRow>(task: Task, rows: &[R]) -> Result<(TrainedModel, TrainingReport), TrainError> {
    train_with_config(task, rows, task.forest_config())
}

pub fn train_with_config<R: FeatureRow>(
    task: Task,
    rows: &[R],
    config: ForestConfig,
) -> Result<(TrainedModel, TrainingReport), TrainError> {
    let data_err = |source| TrainError::Data { task, source };
    let fit_err = |source| TrainError::Fit { task, source };

    if rows.is_empty() {
        return Err(data_err(SplitError::Empty));
    }

    let x = feature_matrix(rows, task.feature_columns())
        .map_err(|source| TrainError::MissingColumn { task, source })?;
    let y: Vec<u8> = rows.iter().map(FeatureRow::label).collect();
    let positives = y.iter().filter(|&&l| l == 1).count();

    info!(
        "Training {} on {} rows ({} positive)",
        task,
        rows.len(),
        positives
    );

    let split = train_test_split(&y, TEST_SIZE, RANDOM_SEED).map_err(data_err)?;
    let x_train = x.select(Axis(0), &split.train);
    let x_test = x.select(Axis(0), &split.test);
    let y_train: Vec<u8> = split.train.iter().map(|&i| y[i]).collect();
    let y_test: Vec<u8> = split.test.iter().map(|&i| y[i]).collect();

    // Scaler statistics come from the training split only
    let scaler = if task.is_scaled() {
        Some(fit_scaler(&x_train).map_err(|source| TrainError::Scale { task, source })?)
    } else {
        None
    };
    let apply = |m: &Array2<f64>| match &scaler {
        Some(fitted) => scaler::scale(fitted, m),
        None => m.clone(),
    };
    let (x_train, x_test, x_full) = (apply(&x_train), apply(&x_test), apply(&x));

    let classifier = RandomForest::fit(config.clone(), &x_train, &y_train).map_err(fit_err)?;

    let predicted = predict_labels(&classifier, &x_test).map_err(fit_err)?;
    let test_metrics = ClassificationMetrics::calculate(&y_test, &predicted);
    info!(
        "{}: accuracy {:.4}, precision {:.4}, recall {:.4}",
        task, test_metrics.accuracy, test_metrics.precision, test_metrics.recall
    );

    let cross_validation = cross_validate(&config, &x_full, &y).map_err(fit_err)?;
    if let Some(cv) = &cross_validation {
        info!("{}: cross-validation accuracy {:.4} (+/- {:.4})", task, cv.mean, cv.std * 2.0);
    }

    let model = TrainedModel {
        task,
        feature_columns: task.feature_columns().iter().map(|c| c.to_string()).collect(),
        classifier,
        scaler,
        trained_at: Utc::now(),
    };
    let report = TrainingReport {
        task,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        positives,
        test_metrics,
        cross_validation,
    };

    Ok((model, report))
}

/// Train a task on the rows its feature strategy builds from the data set
pub fn train_task(
    task: Task,
    tables: &RawTables,
    features: &FeatureTables,
) -> Result<(TrainedModel, TrainingReport), TrainError> {
    match task {
        Task::Podium => train(task, &FeatureEngineering::podium_samples(tables)),
        Task::WdcPoints => train(task, &FeatureEngineering::season_points_samples(tables)),
        Task::Wdc => train(task, &features.drivers),
        Task::Constructors => train(task, &features.constructors),
    }
}

fn predict_labels(classifier: &RandomForest, x: &Array2<f64>) -> Result<Vec<u8>, ForestError> {
    x.rows().into_iter().map(|row| classifier.predict(row)).collect()
}

/// Stratified k-fold accuracy; None when a class has fewer members than folds
fn cross_validate(
    config: &ForestConfig,
    x: &Array2<f64>,
    y: &[u8],
) -> Result<Option<CrossValidationScore>, ForestError> {
    let Ok(folds) = stratified_kfold(y, CV_FOLDS) else {
        debug!("Skipping cross-validation for {} rows: a class cannot fill every fold", y.len());
        return Ok(None);
    };

    let mut fold_accuracy = Vec::with_capacity(folds.len());
    for fold in folds {
        let x_train = x.select(Axis(0), &fold.train);
        let x_test = x.select(Axis(0), &fold.test);
        let y_train: Vec<u8> = fold.train.iter().map(|&i| y[i]).collect();
        let y_test: Vec<u8> = fold.test.iter().map(|&i| y[i]).collect();

        let forest = RandomForest::fit(config.clone(), &x_train, &y_train)?;
        let predicted = predict_labels(&forest, &x_test)?;
        fold_accuracy.push(ClassificationMetrics::calculate(&y_test, &predicted).accuracy);
    }

    Ok(Some(CrossValidationScore::from_folds(fold_accuracy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PodiumSample, SeasonDriverFeatures};

    fn driver_row(season: i32, driver_id: i64, total_points: f64, champion: bool) -> SeasonDriverFeatures {
        SeasonDriverFeatures {
            season,
            driver_id,
            total_points,
            avg_points: total_points / 20.0,
            max_points: if champion { 25.0 } else { 12.0 },
            avg_position: if champion { 1.5 } else { 8.0 },
            best_position: if champion { 1.0 } else { 4.0 },
            avg_grid: if champion { 2.0 } else { 9.0 },
            total_laps: 1100.0,
            avg_laps: 55.0,
            seasons_experience: 5.0,
            age: 28.0,
            is_champion: u8::from(champion),
        }
    }

    fn create_driver_rows() -> Vec<SeasonDriverFeatures> {
        let mut rows = Vec::new();
        for season in 2010..2020 {
            rows.push(driver_row(season, 1, 400.0, true));
            for driver_id in 2..6 {
                rows.push(driver_row(season, driver_id, 40.0 * driver_id as f64, false));
            }
        }
        rows
    }

    fn small_config() -> ForestConfig {
        Task::Wdc.forest_config().with_trees(15)
    }

    #[test]
    fn test_task_columns_and_names() {
        assert_eq!(Task::Podium.feature_columns(), &["driverId", "constructorId", "grid"]);
        assert_eq!(Task::Wdc.feature_columns().len(), 10);
        assert!(Task::Constructors.feature_columns().contains(&"num_drivers"));
        assert!(Task::Wdc.is_scaled());
        assert!(!Task::Podium.is_scaled());
        assert_eq!(Task::Constructors.class_weight(), ClassWeight::Balanced);
        assert_eq!("wdc-points".parse::<Task>().unwrap(), Task::WdcPoints);
        assert!("qualifying".parse::<Task>().is_err());
    }

    #[test]
    fn test_feature_matrix_missing_column() {
        let rows = create_driver_rows();
        let err = feature_matrix(&rows, &["total_points", "num_drivers"]).unwrap_err();
        assert_eq!(err, MissingColumn("num_drivers".to_string()));
    }

    #[test]
    fn test_train_wdc() {
        let rows = create_driver_rows();
        let (model, report) = train_with_config(Task::Wdc, &rows, small_config()).unwrap();

        assert_eq!(report.train_rows + report.test_rows, rows.len());
        assert_eq!(report.positives, 10);
        assert_eq!(report.test_metrics.samples, report.test_rows);
        assert!(report.test_metrics.accuracy > 0.9);
        assert!(report.cross_validation.is_some());

        assert!(model.scaler.is_some());
        assert_eq!(model.feature_columns.len(), 10);

        let x = model.transform(&rows[..1]).unwrap();
        let p = model.predict_proba(x.row(0)).unwrap();
        assert!(p >= 0.5);
    }

    #[test]
    fn test_train_podium_has_no_scaler() {
        let rows: Vec<PodiumSample> = (0..40)
            .map(|i| PodiumSample {
                driver_id: i % 8,
                constructor_id: i % 4,
                grid: i % 20 + 1,
                is_podium: u8::from(i % 20 < 3),
            })
            .collect();

        let config = Task::Podium.forest_config().with_trees(10);
        let (model, _) = train_with_config(Task::Podium, &rows, config).unwrap();
        assert!(model.scaler.is_none());
    }

    #[test]
    fn test_single_class_is_fatal() {
        let rows: Vec<SeasonDriverFeatures> = (0..10)
            .map(|i| driver_row(2000 + i, 1, 10.0, false))
            .collect();

        let err = train_with_config(Task::Wdc, &rows, small_config()).unwrap_err();
        assert!(matches!(
            err,
            TrainError::Data {
                source: SplitError::SingleClass(0),
                ..
            }
        ));
    }

    #[test]
    fn test_small_data_skips_cross_validation() {
        // Two champions cannot fill five folds
        let rows = vec![
            driver_row(2020, 1, 400.0, true),
            driver_row(2020, 2, 80.0, false),
            driver_row(2020, 3, 60.0, false),
            driver_row(2021, 1, 410.0, true),
            driver_row(2021, 2, 90.0, false),
            driver_row(2021, 3, 50.0, false),
        ];

        let (_, report) = train_with_config(Task::Wdc, &rows, small_config()).unwrap();
        assert_eq!(report.train_rows + report.test_rows, 6);
        assert!(report.cross_validation.is_none());
    }

    #[test]
    fn test_cross_validation_folds_all_have_test_rows() {
        let rows = create_driver_rows();
        let (_, report) = train_with_config(Task::Wdc, &rows, small_config()).unwrap();

        let cv = report.cross_validation.unwrap();
        assert_eq!(cv.fold_accuracy.len(), CV_FOLDS);
        assert!(cv.fold_accuracy.iter().all(|&a| a > 0.0));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let rows = create_driver_rows();
        let err = train_with_config(Task::Constructors, &rows, small_config()).unwrap_err();
        assert!(matches!(err, TrainError::MissingColumn { .. }));
    }

    #[test]
    fn test_empty_rows_are_fatal() {
        let rows: Vec<SeasonDriverFeatures> = Vec::new();
        assert!(train(Task::Wdc, &rows).is_err());
    }
}
