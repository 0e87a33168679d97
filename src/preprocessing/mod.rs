//! Preprocessing transformers for the feature pipeline.
//!
//! Raw student attributes become a comparable 3-channel matrix here:
//! academic and wellbeing are standardized across the batch, the activity
//! label is encoded to an integer code, and each channel is multiplied by
//! its configured weight.
//!
//! # Example
//!
//! ```
//! use asignar::prelude::*;
//! use asignar::preprocessing::StandardScaler;
//!
//! let data = Matrix::from_vec(4, 2, vec![
//!     1.0, 100.0,
//!     2.0, 200.0,
//!     3.0, 300.0,
//!     4.0, 400.0,
//! ]).expect("valid matrix dimensions");
//!
//! let mut scaler = StandardScaler::new();
//! let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
//!
//! // Each column now has mean ≈ 0 and std ≈ 1
//! assert!(scaled.get(0, 0).abs() < 2.0);
//! ```

use crate::error::{AsignarError, Result};
use crate::primitives::Matrix;
use crate::student::StudentRecord;
use crate::traits::Transformer;
use crate::weights::WeightConfig;
use serde::{Deserialize, Serialize};

/// Standardizes features by removing mean and scaling to unit variance.
///
/// The standard score of a sample x is: z = (x - mean) / std, with the
/// POPULATION standard deviation (divide by n, not n-1). A zero-variance
/// column — including any column of a single-row batch — standardizes to
/// exactly 0.0 for every row instead of dividing by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f32>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f32>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Creates a new unfitted `StandardScaler`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
        }
    }

    /// Returns the mean of each feature.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn mean(&self) -> &[f32] {
        self.mean
            .as_ref()
            .expect("Scaler not fitted. Call fit() first.")
    }

    /// Returns the standard deviation of each feature.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn std(&self) -> &[f32] {
        self.std
            .as_ref()
            .expect("Scaler not fitted. Call fit() first.")
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and population standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }

        let mut mean = vec![0.0; n_features];
        for (j, mean_j) in mean.iter_mut().enumerate() {
            let mut sum = 0.0;
            for i in 0..n_samples {
                sum += x.get(i, j);
            }
            *mean_j = sum / n_samples as f32;
        }

        let mut std = vec![0.0; n_features];
        for (j, std_j) in std.iter_mut().enumerate() {
            let mut sum_sq = 0.0;
            for i in 0..n_samples {
                let diff = x.get(i, j) - mean[j];
                sum_sq += diff * diff;
            }
            *std_j = (sum_sq / n_samples as f32).sqrt();
        }

        self.mean = Some(mean);
        self.std = Some(std);

        Ok(())
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| AsignarError::from("Scaler not fitted"))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| AsignarError::from("Scaler not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(AsignarError::DimensionMismatch {
                expected: format!("{} features", mean.len()),
                actual: format!("{n_features} features"),
            });
        }

        let mut result = vec![0.0; n_samples * n_features];

        for i in 0..n_samples {
            for j in 0..n_features {
                // A degenerate column standardizes to exactly 0, never NaN.
                result[i * n_features + j] = if std[j] > 1e-10 {
                    (x.get(i, j) - mean[j]) / std[j]
                } else {
                    0.0
                };
            }
        }

        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

/// Maps activity labels to integer codes, lexicographically.
///
/// Codes are assigned by sorting the distinct labels of the batch, so they
/// do not depend on row order. They remain batch-relative: a label's code is
/// only meaningful within the run that fitted the encoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityEncoder {
    categories: Option<Vec<String>>,
}

impl ActivityEncoder {
    /// Creates a new unfitted encoder.
    #[must_use]
    pub fn new() -> Self {
        Self { categories: None }
    }

    /// Collects and sorts the distinct labels of the batch.
    pub fn fit(&mut self, labels: &[String]) {
        let mut categories: Vec<String> = labels.to_vec();
        categories.sort();
        categories.dedup();
        self.categories = Some(categories);
    }

    /// Encodes labels to their fitted codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder is not fitted or a label was not seen
    /// during fit.
    pub fn transform(&self, labels: &[String]) -> Result<Vec<usize>> {
        let categories = self
            .categories
            .as_ref()
            .ok_or_else(|| AsignarError::from("Encoder not fitted"))?;

        labels
            .iter()
            .map(|label| {
                categories
                    .binary_search(label)
                    .map_err(|_| AsignarError::Other(format!("unknown activity label: {label}")))
            })
            .collect()
    }

    /// Fits and encodes in one step.
    pub fn fit_transform(&mut self, labels: &[String]) -> Vec<usize> {
        self.fit(labels);
        // Every label was just seen during fit.
        self.transform(labels)
            .expect("labels fitted in the same call")
    }

    /// Returns the fitted categories in code order.
    ///
    /// # Panics
    ///
    /// Panics if the encoder is not fitted.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        self.categories
            .as_ref()
            .expect("Encoder not fitted. Call fit() first.")
    }

    /// Returns true if the encoder has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.categories.is_some()
    }
}

/// Builds the weighted per-student feature matrix.
///
/// Columns are {academic, wellbeing, activity code}; the numeric columns are
/// standardized across the batch, then every column is multiplied by its
/// configured weight. Purely functional over the batch.
///
/// # Errors
///
/// Returns [`AsignarError::InsufficientData`] for an empty batch.
pub fn feature_matrix(records: &[StudentRecord], weights: &WeightConfig) -> Result<Matrix<f32>> {
    let n = records.len();
    if n == 0 {
        return Err(AsignarError::insufficient_data("student batch is empty"));
    }

    let mut numeric = Vec::with_capacity(n * 2);
    for record in records {
        numeric.push(record.academic);
        numeric.push(record.wellbeing);
    }
    let numeric = Matrix::from_vec(n, 2, numeric)?;

    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(&numeric)?;

    let labels: Vec<String> = records.iter().map(StudentRecord::activity_label).collect();
    let mut encoder = ActivityEncoder::new();
    let codes = encoder.fit_transform(&labels);

    let mut data = Vec::with_capacity(n * 3);
    for i in 0..n {
        data.push(scaled.get(i, 0) * weights.academic);
        data.push(scaled.get(i, 1) * weights.wellbeing);
        data.push(codes[i] as f32 * weights.activities);
    }

    tracing::debug!(students = n, "feature matrix built");

    Matrix::from_vec(n, 3, data).map_err(Into::into)
}
