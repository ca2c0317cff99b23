//! Random Forest Classifier
//!
//! Bagged `linfa-trees` CART trees grown with Gini impurity on seeded
//! bootstrap samples, with optional balanced class weights carried as linfa
//! sample weights. The forest probability is the share of trees voting for
//! the positive class.

use linfa::prelude::*;
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::BinaryClassifier;

/// Forest fitting errors
#[derive(Debug, Error)]
pub enum ForestError {
    #[error("cannot fit on empty data")]
    EmptyData,

    #[error("feature matrix has {rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("labels must be 0 or 1, got {0}")]
    InvalidLabel(u8),

    #[error("row has {actual} features, model expects {expected}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("decision tree: {0}")]
    Tree(String),
}

/// Class weighting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every sample weighs 1
    Uniform,
    /// `n_samples / (2 * n_class)`, so both classes carry equal total weight
    Balanced,
}

/// Forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(12),
            class_weight: ClassWeight::Uniform,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }
}

/// Fitted random forest binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<DecisionTree<f64, usize>>,
}

impl RandomForest {
    /// Fit a forest on a feature matrix and 0/1 labels
    pub fn fit(config: ForestConfig, x: &Array2<f64>, y: &[u8]) -> Result<Self, ForestError> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ForestError::EmptyData);
        }
        if x.nrows() != y.len() {
            return Err(ForestError::LengthMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        if let Some(&bad) = y.iter().find(|&&label| label > 1) {
            return Err(ForestError::InvalidLabel(bad));
        }

        let class_weights = class_weights(y, config.class_weight);
        let params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(config.max_depth);
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut trees = Vec::with_capacity(config.n_trees);
        for _ in 0..config.n_trees {
            // Bootstrap: a row drawn k times enters once with k times its class weight
            let mut draws = vec![0u32; n];
            for _ in 0..n {
                draws[rng.gen_range(0..n)] += 1;
            }
            let rows: Vec<usize> = (0..n).filter(|&i| draws[i] > 0).collect();

            let records = x.select(Axis(0), &rows);
            let targets: Array1<usize> = rows.iter().map(|&i| usize::from(y[i])).collect();
            let weights: Array1<f32> = rows
                .iter()
                .map(|&i| draws[i] as f32 * class_weights[usize::from(y[i])])
                .collect();

            let dataset = Dataset::new(records, targets).with_weights(weights);
            let tree = params
                .fit(&dataset)
                .map_err(|e| ForestError::Tree(e.to_string()))?;
            trees.push(tree);
        }

        Ok(Self {
            config,
            n_features: x.ncols(),
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree<f64, usize>] {
        &self.trees
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

impl BinaryClassifier for RandomForest {
    type Error = ForestError;

    fn predict_proba(&self, row: ArrayView1<f64>) -> Result<f64, ForestError> {
        if row.len() != self.n_features {
            return Err(ForestError::FeatureCount {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if self.trees.is_empty() {
            return Ok(0.0);
        }

        let record = row.to_owned().insert_axis(Axis(0));
        let votes = self
            .trees
            .iter()
            .filter(|tree| {
                let predicted: Array1<usize> = tree.predict(&record);
                predicted[0] == 1
            })
            .count();
        Ok(votes as f64 / self.trees.len() as f64)
    }
}

/// Per-class sample weights indexed by label
fn class_weights(y: &[u8], strategy: ClassWeight) -> [f32; 2] {
    match strategy {
        ClassWeight::Uniform => [1.0, 1.0],
        ClassWeight::Balanced => {
            let n = y.len() as f32;
            let positives = y.iter().filter(|&&l| l == 1).count() as f32;
            let negatives = n - positives;
            let weight = |count: f32| if count > 0.0 { n / (2.0 * count) } else { 1.0 };
            [weight(negatives), weight(positives)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> (Array2<f64>, Vec<u8>) {
        let x = array![
            [1.0, 10.0],
            [2.0, 11.0],
            [3.0, 9.0],
            [4.0, 12.0],
            [10.0, 1.0],
            [11.0, 2.0],
            [12.0, 0.5],
            [13.0, 1.5],
        ];
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    fn probabilities(forest: &RandomForest, x: &Array2<f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| forest.predict_proba(row).unwrap())
            .collect()
    }

    #[test]
    fn test_fit_separable() {
        let (x, y) = separable_data();
        let forest = RandomForest::fit(ForestConfig::default().with_trees(25), &x, &y).unwrap();

        assert_eq!(forest.trees().len(), 25);
        assert_eq!(forest.n_features(), 2);

        let low = forest.predict_proba(array![1.5, 10.5].view()).unwrap();
        let high = forest.predict_proba(array![12.5, 1.0].view()).unwrap();
        assert!(low < 0.5, "expected negative, got {}", low);
        assert!(high >= 0.5, "expected positive, got {}", high);
        assert_eq!(forest.predict(array![12.5, 1.0].view()).unwrap(), 1);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = separable_data();
        let forest = RandomForest::fit(ForestConfig::default().with_trees(10), &x, &y).unwrap();

        for p in probabilities(&forest, &x) {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let (x, y) = separable_data();
        let config = ForestConfig::default().with_trees(10).with_seed(7);
        let a = RandomForest::fit(config.clone(), &x, &y).unwrap();
        let b = RandomForest::fit(config, &x, &y).unwrap();

        assert_eq!(probabilities(&a, &x), probabilities(&b, &x));
    }

    #[test]
    fn test_balanced_weights_lift_minority_class() {
        // One positive among many negatives that share its feature value
        let x = array![[0.0], [0.0], [0.0], [0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [1.0]];
        let y = vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 1];

        let uniform = RandomForest::fit(ForestConfig::default().with_trees(30), &x, &y).unwrap();
        let balanced = RandomForest::fit(
            ForestConfig::default()
                .with_trees(30)
                .with_class_weight(ClassWeight::Balanced),
            &x,
            &y,
        )
        .unwrap();

        let row = array![1.0];
        assert!(
            balanced.predict_proba(row.view()).unwrap() >= uniform.predict_proba(row.view()).unwrap()
        );
    }

    #[test]
    fn test_fit_errors() {
        let (x, _) = separable_data();
        let empty = Array2::<f64>::zeros((0, 2));

        assert!(matches!(
            RandomForest::fit(ForestConfig::default(), &empty, &[]),
            Err(ForestError::EmptyData)
        ));
        assert!(matches!(
            RandomForest::fit(ForestConfig::default(), &x, &[0, 1]),
            Err(ForestError::LengthMismatch { .. })
        ));
        assert!(matches!(
            RandomForest::fit(ForestConfig::default(), &x, &[0, 1, 2, 0, 1, 0, 1, 0]),
            Err(ForestError::InvalidLabel(2))
        ));
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = separable_data();
        let forest = RandomForest::fit(ForestConfig::default().with_trees(3), &x, &y).unwrap();
        let err = forest.predict_proba(array![1.0, 2.0, 3.0].view()).unwrap_err();
        assert!(matches!(err, ForestError::FeatureCount { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_balanced_class_weights() {
        let y = vec![0, 0, 0, 1];
        let weights = class_weights(&y, ClassWeight::Balanced);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-6);
        assert!((weights[1] - 2.0).abs() < 1e-6);

        assert_eq!(class_weights(&y, ClassWeight::Uniform), [1.0, 1.0]);
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let (x, y) = separable_data();
        let forest = RandomForest::fit(ForestConfig::default().with_trees(5), &x, &y).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForest = serde_json::from_str(&json).unwrap();

        assert_eq!(probabilities(&forest, &x), probabilities(&restored, &x));
    }
}
