//! Centroid-based cluster assignment.
//!
//! Partitions the embedding matrix into a bounded number of groups with
//! Lloyd's algorithm. Initialization is a deterministic k-means++ variant:
//! the seed picks the first centroid, every further centroid is the point
//! farthest from the ones chosen so far. Identical inputs and an identical
//! `random_state` therefore always produce identical labels.

use crate::error::{AsignarError, Result};
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;

/// K-Means clustering over embedding rows.
///
/// # Algorithm
///
/// 1. Initialize centroids (seeded pick, then farthest-point selection)
/// 2. Assign each row to its nearest centroid
/// 3. Update centroids as the mean of assigned rows
/// 4. Repeat until convergence or max iterations
///
/// # Examples
///
/// ```
/// use asignar::prelude::*;
///
/// let data = Matrix::from_vec(6, 2, vec![
///     1.0, 2.0,
///     1.5, 1.8,
///     5.0, 8.0,
///     8.0, 8.0,
///     1.0, 0.6,
///     9.0, 11.0,
/// ]).unwrap();
///
/// let mut kmeans = KMeans::new(2).with_random_state(42);
/// kmeans.fit(&data).unwrap();
///
/// let labels = kmeans.predict(&data);
/// assert_eq!(labels.len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance.
    tol: f32,
    /// Random seed for initialization.
    random_state: Option<u64>,
    /// Cluster centroids after fitting.
    centroids: Option<Matrix<f32>>,
    /// Sum of squared distances (inertia).
    inertia: f32,
    /// Number of iterations run.
    n_iter: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(3)
    }
}

impl KMeans {
    /// Creates a new K-Means with the specified number of clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_state: None,
            centroids: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Returns the cluster centroids.
    ///
    /// # Panics
    ///
    /// Panics if model is not fitted.
    #[must_use]
    pub fn centroids(&self) -> &Matrix<f32> {
        self.centroids
            .as_ref()
            .expect("Model not fitted. Call fit() first.")
    }

    /// Returns the inertia (within-cluster sum of squares).
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Returns the number of iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }

    /// Deterministic k-means++-style initialization.
    ///
    /// The seed selects the first centroid; each remaining centroid is the
    /// point with maximum squared distance to its nearest chosen centroid.
    fn init_centroids(&self, x: &Matrix<f32>) -> Matrix<f32> {
        let (n_samples, n_features) = x.shape();
        let mut centroids_data = Vec::with_capacity(self.n_clusters * n_features);

        let seed = self.random_state.unwrap_or(42);
        let first_idx = (seed as usize) % n_samples;

        for j in 0..n_features {
            centroids_data.push(x.get(first_idx, j));
        }

        for _ in 1..self.n_clusters {
            let n_current = centroids_data.len() / n_features;
            let mut min_distances = vec![f32::INFINITY; n_samples];

            for (i, min_dist) in min_distances.iter_mut().enumerate() {
                for c in 0..n_current {
                    let mut dist_sq = 0.0;
                    for j in 0..n_features {
                        let diff = x.get(i, j) - centroids_data[c * n_features + j];
                        dist_sq += diff * diff;
                    }
                    if dist_sq < *min_dist {
                        *min_dist = dist_sq;
                    }
                }
            }

            let mut max_dist = 0.0;
            let mut max_idx = 0;
            for (i, &dist) in min_distances.iter().enumerate() {
                if dist > max_dist {
                    max_dist = dist;
                    max_idx = i;
                }
            }

            for j in 0..n_features {
                centroids_data.push(x.get(max_idx, j));
            }
        }

        Matrix::from_vec(self.n_clusters, n_features, centroids_data)
            .expect("Internal error: centroid matrix creation failed")
    }

    /// Assigns each row to the nearest centroid.
    fn assign_labels(&self, x: &Matrix<f32>, centroids: &Matrix<f32>) -> Vec<usize> {
        let n_samples = x.n_rows();
        let mut labels = vec![0; n_samples];

        for (i, label) in labels.iter_mut().enumerate() {
            let point = x.row(i);
            let mut min_dist = f32::INFINITY;
            let mut min_cluster = 0;

            for k in 0..self.n_clusters {
                let centroid = centroids.row(k);
                let diff = &point - &centroid;
                let dist = diff.norm_squared();

                if dist < min_dist {
                    min_dist = dist;
                    min_cluster = k;
                }
            }

            *label = min_cluster;
        }

        labels
    }

    /// Updates centroids as the mean of assigned rows.
    ///
    /// A cluster that lost all its rows keeps a zero centroid for this
    /// round; with duplicate embeddings this is how fewer than `n_clusters`
    /// distinct labels can be reported.
    fn update_centroids(&self, x: &Matrix<f32>, labels: &[usize]) -> Matrix<f32> {
        let (_, n_features) = x.shape();
        let mut new_centroids = vec![0.0; self.n_clusters * n_features];
        let mut counts = vec![0usize; self.n_clusters];

        for (i, &label) in labels.iter().enumerate() {
            counts[label] += 1;
            for j in 0..n_features {
                new_centroids[label * n_features + j] += x.get(i, j);
            }
        }

        for k in 0..self.n_clusters {
            if counts[k] > 0 {
                for j in 0..n_features {
                    new_centroids[k * n_features + j] /= counts[k] as f32;
                }
            }
        }

        Matrix::from_vec(self.n_clusters, n_features, new_centroids)
            .expect("Internal error: centroid update failed")
    }

    /// Checks if centroids have converged.
    fn centroids_converged(&self, old: &Matrix<f32>, new: &Matrix<f32>) -> bool {
        let (n_clusters, n_features) = old.shape();

        for k in 0..n_clusters {
            let mut dist_sq = 0.0;
            for j in 0..n_features {
                let diff = old.get(k, j) - new.get(k, j);
                dist_sq += diff * diff;
            }
            if dist_sq > self.tol * self.tol {
                return false;
            }
        }

        true
    }

    /// Within-cluster sum of squared distances.
    fn compute_inertia(&self, x: &Matrix<f32>, centroids: &Matrix<f32>, labels: &[usize]) -> f32 {
        let mut total = 0.0;
        for (i, &label) in labels.iter().enumerate() {
            let diff = &x.row(i) - &centroids.row(label);
            total += diff.norm_squared();
        }
        total
    }
}

impl UnsupervisedEstimator for KMeans {
    type Labels = Vec<usize>;

    /// Fits the K-Means model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty or has fewer rows than clusters.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let n_samples = x.n_rows();

        if n_samples == 0 {
            return Err(AsignarError::insufficient_data(
                "cannot fit with zero samples",
            ));
        }

        if n_samples < self.n_clusters {
            return Err(AsignarError::InvalidHyperparameter {
                param: "n_clusters".to_string(),
                value: self.n_clusters.to_string(),
                constraint: format!("n_clusters <= n_samples ({n_samples})"),
            });
        }

        let mut centroids = self.init_centroids(x);
        let mut labels = vec![0; n_samples];

        for iter in 0..self.max_iter {
            labels = self.assign_labels(x, &centroids);

            let new_centroids = self.update_centroids(x, &labels);

            if self.centroids_converged(&centroids, &new_centroids) {
                self.n_iter = iter + 1;
                centroids = new_centroids;
                break;
            }

            centroids = new_centroids;
            self.n_iter = iter + 1;
        }

        self.inertia = self.compute_inertia(x, &centroids, &labels);
        self.centroids = Some(centroids);

        Ok(())
    }

    /// Predicts cluster labels for data.
    fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        let centroids = self
            .centroids
            .as_ref()
            .expect("Model not fitted. Call fit() first.");

        self.assign_labels(x, centroids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Matrix<f32> {
        // Two well-separated clusters
        Matrix::from_vec(
            6,
            2,
            vec![1.0, 2.0, 1.5, 1.8, 1.0, 0.6, 8.0, 8.0, 9.0, 11.0, 8.5, 9.0],
        )
        .unwrap()
    }

    #[test]
    fn test_new() {
        let kmeans = KMeans::new(3);
        assert_eq!(kmeans.n_clusters, 3);
        assert!(!kmeans.is_fitted());
    }

    #[test]
    fn test_default_cluster_count() {
        let kmeans = KMeans::default();
        assert_eq!(kmeans.n_clusters, 3);
    }

    #[test]
    fn test_fit_basic() {
        let data = sample_data();
        let mut kmeans = KMeans::new(2).with_random_state(42);
        kmeans.fit(&data).unwrap();

        assert!(kmeans.is_fitted());
        assert_eq!(kmeans.centroids().shape(), (2, 2));
        assert!(kmeans.inertia() >= 0.0);
    }

    #[test]
    fn test_predict_labels_in_range() {
        let data = sample_data();
        let mut kmeans = KMeans::new(2).with_random_state(42);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.predict(&data);
        assert_eq!(labels.len(), 6);
        for &label in &labels {
            assert!(label < 2);
        }
    }

    #[test]
    fn test_labels_consistency() {
        let data = sample_data();
        let mut kmeans = KMeans::new(2).with_random_state(42);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.predict(&data);

        // First 3 points in one cluster, last 3 in the other
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_empty_data_error() {
        let data = Matrix::from_vec(0, 2, vec![]).unwrap();
        let mut kmeans = KMeans::new(2);
        let result = kmeans.fit(&data);
        assert!(matches!(
            result,
            Err(AsignarError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_too_many_clusters_error() {
        let data = Matrix::from_vec(3, 2, vec![1.0; 6]).unwrap();
        let mut kmeans = KMeans::new(5);
        let result = kmeans.fit(&data);
        assert!(matches!(
            result,
            Err(AsignarError::InvalidHyperparameter { .. })
        ));
    }

    #[test]
    fn test_single_cluster() {
        let data = sample_data();
        let mut kmeans = KMeans::new(1).with_random_state(42);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.predict(&data);
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_single_point_single_cluster() {
        let data = Matrix::from_vec(1, 16, vec![0.0; 16]).unwrap();
        let mut kmeans = KMeans::new(1).with_random_state(42);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.predict(&data);
        assert_eq!(labels, vec![0]);
    }

    #[test]
    fn test_reproducibility() {
        let data = sample_data();

        let mut kmeans1 = KMeans::new(2).with_random_state(42);
        kmeans1.fit(&data).unwrap();

        let mut kmeans2 = KMeans::new(2).with_random_state(42);
        kmeans2.fit(&data).unwrap();

        assert_eq!(kmeans1.predict(&data), kmeans2.predict(&data));

        let c1 = kmeans1.centroids();
        let c2 = kmeans2.centroids();
        for i in 0..2 {
            for j in 0..2 {
                assert!((c1.get(i, j) - c2.get(i, j)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_exact_k_samples() {
        // Exactly k samples for k clusters: every point is its own centroid
        let data = Matrix::from_vec(3, 2, vec![0.0, 0.0, 5.0, 5.0, 10.0, 10.0]).unwrap();

        let mut kmeans = KMeans::new(3).with_random_state(42);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.predict(&data);
        assert_ne!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
        assert_ne!(labels[0], labels[2]);
        assert!(kmeans.inertia() < 1e-6);
    }

    #[test]
    fn test_identical_points_collapse_to_one_label() {
        // Duplicate rows: the farthest-point init places every centroid on
        // the same point and a single label survives.
        let data =
            Matrix::from_vec(5, 2, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();

        let mut kmeans = KMeans::new(2).with_random_state(42);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.predict(&data);
        let first = labels[0];
        assert!(labels.iter().all(|&l| l == first));
        assert!(kmeans.inertia() < 1e-6);
    }

    #[test]
    fn test_three_clusters_all_present() {
        let data = Matrix::from_vec(
            9,
            2,
            vec![
                0.0, 0.0, 0.1, 0.1, 0.2, 0.0, 5.0, 5.0, 5.1, 5.1, 5.0, 5.2, 10.0, 0.0, 10.1, 0.1,
                10.0, 0.2,
            ],
        )
        .unwrap();

        let mut kmeans = KMeans::new(3).with_random_state(42);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.predict(&data);
        let mut unique: Vec<usize> = labels.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_max_iter_limit() {
        let data = sample_data();
        let mut kmeans = KMeans::new(2).with_max_iter(1).with_random_state(42);
        kmeans.fit(&data).unwrap();
        assert_eq!(kmeans.n_iter(), 1);
    }

    #[test]
    fn test_convergence() {
        let data = sample_data();
        let mut kmeans = KMeans::new(2).with_max_iter(1000).with_random_state(42);
        kmeans.fit(&data).unwrap();
        assert!(kmeans.n_iter() < 100);
    }

    #[test]
    fn test_high_dimensional_embeddings() {
        // 16-wide rows, like the embedding matrix the assigner consumes
        let mut data = vec![0.0f32; 6 * 16];
        for i in 3..6 {
            for j in 0..16 {
                data[i * 16 + j] = 10.0;
            }
        }
        let matrix = Matrix::from_vec(6, 16, data).unwrap();

        let mut kmeans = KMeans::new(2).with_random_state(42);
        kmeans.fit(&matrix).unwrap();

        let labels = kmeans.predict(&matrix);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
    }
}
