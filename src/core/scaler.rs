//! Standard Scaler (Z-score normalization).
//!
//! Backed by `linfa-preprocessing`'s standard `LinearScaler`: offsets are the
//! column means and scales the inverse population standard deviations of the
//! fitting rows.

use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Fitted per-column offset and scale
pub type StandardScaler = LinearScaler<f64>;

#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("cannot fit a scaler on empty data")]
    Empty,

    #[error("scaler fit failed: {0}")]
    Fit(String),
}

/// Fit on the rows of `x`
pub fn fit_scaler(x: &Array2<f64>) -> Result<StandardScaler, ScalerError> {
    if x.nrows() == 0 {
        return Err(ScalerError::Empty);
    }

    // Targets are unused by the scaler
    let dataset = DatasetBase::new(x.clone(), Array1::<usize>::zeros(x.nrows()));
    LinearScaler::<f64>::standard()
        .fit(&dataset)
        .map_err(|e| ScalerError::Fit(e.to_string()))
}

/// Apply the fitted transform; never re-fits
pub fn scale(scaler: &StandardScaler, x: &Array2<f64>) -> Array2<f64> {
    scaler.transform(x.clone())
}

pub fn n_features(scaler: &StandardScaler) -> usize {
    scaler.offsets().len()
}
