//! Core modelling modules: classifier, scaling, splitting and evaluation

pub mod forest;
pub mod metrics;
pub mod scaler;
pub mod split;

use ndarray::ArrayView1;

// Re-export commonly used types
pub use forest::{ClassWeight, ForestConfig, ForestError, RandomForest};
pub use metrics::{ClassificationMetrics, CrossValidationScore};
pub use scaler::{fit_scaler, ScalerError, StandardScaler};
pub use split::{stratified_kfold, train_test_split, SplitError, TrainTestSplit};

/// Decision boundary applied to the positive-class probability
pub const DECISION_THRESHOLD: f64 = 0.5;

/// A fitted binary classifier with probabilistic output
pub trait BinaryClassifier {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Probability of the positive class, in [0, 1]
    fn predict_proba(&self, row: ArrayView1<f64>) -> Result<f64, Self::Error>;

    /// Predicted label: 1 iff the positive-class probability reaches the threshold
    fn predict(&self, row: ArrayView1<f64>) -> Result<u8, Self::Error> {
        Ok(u8::from(self.predict_proba(row)? >= DECISION_THRESHOLD))
    }
}
