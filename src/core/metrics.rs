//! Classification Metrics
//!
//! Accuracy, precision, recall and confusion matrix on a held-out split, plus a
//! cross-validation summary.

use serde::{Deserialize, Serialize};

/// Held-out evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
}

impl Default for ClassificationMetrics {
    fn default() -> Self {
        Self {
            samples: 0,
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            confusion_matrix: [[0, 0], [0, 0]],
        }
    }
}

impl ClassificationMetrics {
    /// Compare true and predicted labels. Undefined ratios are reported as 0.
    pub fn calculate(actual: &[u8], predicted: &[u8]) -> Self {
        if actual.is_empty() {
            return Self::default();
        }

        let mut matrix = [[0usize; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted) {
            matrix[usize::from(a == 1)][usize::from(p == 1)] += 1;
        }

        let [[tn, fp], [fn_, tp]] = matrix;
        let samples = tn + fp + fn_ + tp;

        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        Self {
            samples,
            accuracy: ratio(tp + tn, samples),
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            confusion_matrix: matrix,
        }
    }
}

/// Accuracy per fold with mean and population standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationScore {
    pub fold_accuracy: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl CrossValidationScore {
    pub fn from_folds(fold_accuracy: Vec<f64>) -> Self {
        if fold_accuracy.is_empty() {
            return Self {
                fold_accuracy,
                mean: 0.0,
                std: 0.0,
            };
        }

        let n = fold_accuracy.len() as f64;
        let mean = fold_accuracy.iter().sum::<f64>() / n;
        let variance = fold_accuracy.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;

        Self {
            fold_accuracy,
            mean,
            std: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_metrics() {
        let actual = [1, 1, 1, 0, 0, 0, 0, 0];
        let predicted = [1, 1, 0, 1, 0, 0, 0, 0];
        let metrics = ClassificationMetrics::calculate(&actual, &predicted);

        assert_eq!(metrics.samples, 8);
        assert_eq!(metrics.confusion_matrix, [[4, 1], [1, 2]]);
        assert!((metrics.accuracy - 0.75).abs() < 0.001);
        assert!((metrics.precision - 2.0 / 3.0).abs() < 0.001);
        assert!((metrics.recall - 2.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_no_positive_predictions() {
        let metrics = ClassificationMetrics::calculate(&[1, 0, 0], &[0, 0, 0]);

        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert!((metrics.accuracy - 2.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = ClassificationMetrics::calculate(&[], &[]);
        assert_eq!(metrics, ClassificationMetrics::default());
    }

    #[test]
    fn test_cross_validation_score() {
        let score = CrossValidationScore::from_folds(vec![0.8, 1.0, 0.9, 0.9, 0.9]);

        assert!((score.mean - 0.9).abs() < 1e-9);
        assert!((score.std - (0.004f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_cross_validation_empty() {
        let score = CrossValidationScore::from_folds(Vec::new());
        assert_eq!(score.mean, 0.0);
        assert_eq!(score.std, 0.0);
    }
}
