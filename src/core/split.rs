//! Stratified train/test splitting and k-fold partitioning

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

/// Dataset shape errors that make fitting impossible
#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("dataset is empty")]
    Empty,

    #[error("label column contains a single class ({0})")]
    SingleClass(u8),

    #[error("class {label} has {count} member(s), at least 2 are required")]
    TooFewMembers { label: u8, count: usize },

    #[error("cannot make {folds} folds from {rows} rows")]
    TooFewRows { folds: usize, rows: usize },

    #[error("class {label} has {count} member(s), fewer than {folds} folds")]
    ClassSmallerThanFolds { label: u8, count: usize, folds: usize },
}

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn indices_by_class(y: &[u8]) -> [Vec<usize>; 2] {
    let mut classes: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &label) in y.iter().enumerate() {
        classes[usize::from(label == 1)].push(i);
    }
    classes
}

/// Split rows into train/test keeping the class ratio in both parts.
///
/// Each class contributes `round(count * test_size)` rows to the test part,
/// at least one and never all of them.
pub fn train_test_split(y: &[u8], test_size: f64, seed: u64) -> Result<TrainTestSplit, SplitError> {
    if y.is_empty() {
        return Err(SplitError::Empty);
    }

    let classes = indices_by_class(y);
    for (label, members) in classes.iter().enumerate() {
        if members.is_empty() {
            return Err(SplitError::SingleClass(1 - label as u8));
        }
    }
    for (label, members) in classes.iter().enumerate() {
        if members.len() < 2 {
            return Err(SplitError::TooFewMembers {
                label: label as u8,
                count: members.len(),
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for mut members in classes {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_size).round() as usize)
            .clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

/// Stratified k-fold partition without shuffling: members of each class are
/// dealt to the folds in row order, so every class must fill every fold.
pub fn stratified_kfold(y: &[u8], folds: usize) -> Result<Vec<TrainTestSplit>, SplitError> {
    if folds < 2 || y.len() < folds {
        return Err(SplitError::TooFewRows {
            folds,
            rows: y.len(),
        });
    }

    let classes = indices_by_class(y);
    for (label, members) in classes.iter().enumerate() {
        if members.is_empty() {
            return Err(SplitError::SingleClass(1 - label as u8));
        }
        if members.len() < folds {
            return Err(SplitError::ClassSmallerThanFolds {
                label: label as u8,
                count: members.len(),
                folds,
            });
        }
    }

    let mut assignment = vec![0usize; y.len()];
    for members in classes {
        for (position, &i) in members.iter().enumerate() {
            assignment[i] = position % folds;
        }
    }

    Ok((0..folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| assignment[i] == fold);
            TrainTestSplit { train, test }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(negatives: usize, positives: usize) -> Vec<u8> {
        let mut y = vec![0u8; negatives];
        y.extend(vec![1u8; positives]);
        y
    }

    #[test]
    fn test_split_is_stratified() {
        let y = labels(80, 20);
        let split = train_test_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let test_positives = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_positives, 4);
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let y = labels(13, 7);
        let split = train_test_split(&y, 0.2, 1).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_keeps_one_of_each_class_in_test() {
        let y = labels(10, 2);
        let split = train_test_split(&y, 0.2, 42).unwrap();
        assert_eq!(split.test.iter().filter(|&&i| y[i] == 1).count(), 1);
        assert_eq!(split.train.iter().filter(|&&i| y[i] == 1).count(), 1);
    }

    #[test]
    fn test_split_is_deterministic() {
        let y = labels(30, 10);
        assert_eq!(
            train_test_split(&y, 0.2, 42).unwrap(),
            train_test_split(&y, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn test_split_errors() {
        assert_eq!(train_test_split(&[], 0.2, 42), Err(SplitError::Empty));
        assert_eq!(
            train_test_split(&labels(5, 0), 0.2, 42),
            Err(SplitError::SingleClass(0))
        );
        assert_eq!(
            train_test_split(&labels(5, 1), 0.2, 42),
            Err(SplitError::TooFewMembers { label: 1, count: 1 })
        );
    }

    #[test]
    fn test_kfold_partitions() {
        let y = labels(10, 5);
        let folds = stratified_kfold(&y, 5).unwrap();

        assert_eq!(folds.len(), 5);
        for fold in &folds {
            assert_eq!(fold.test.len(), 3);
            assert_eq!(fold.train.len(), 12);
            assert_eq!(fold.test.iter().filter(|&&i| y[i] == 1).count(), 1);
        }

        let mut tested: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        tested.sort_unstable();
        assert_eq!(tested, (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_kfold_too_few_rows() {
        assert!(stratified_kfold(&labels(2, 1), 5).is_err());
    }

    #[test]
    fn test_kfold_rejects_class_smaller_than_folds() {
        assert_eq!(
            stratified_kfold(&labels(4, 2), 5),
            Err(SplitError::ClassSmallerThanFolds {
                label: 0,
                count: 4,
                folds: 5
            })
        );
        assert_eq!(
            stratified_kfold(&labels(20, 3), 5),
            Err(SplitError::ClassSmallerThanFolds {
                label: 1,
                count: 3,
                folds: 5
            })
        );
        assert_eq!(
            stratified_kfold(&labels(10, 0), 5),
            Err(SplitError::SingleClass(0))
        );

        // Every fold gets test rows from both classes once each class fills the folds
        let y = labels(20, 5);
        for fold in stratified_kfold(&y, 5).unwrap() {
            assert!(fold.test.iter().any(|&i| y[i] == 0));
            assert!(fold.test.iter().any(|&i| y[i] == 1));
        }
    }
}
