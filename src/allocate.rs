//! Allocation orchestrator.
//!
//! Sequences the pipeline — feature normalization, relationship graph,
//! embedding, clustering — and shapes the result. One call to
//! [`Allocator::run`] is one unit of work: it constructs fresh transformers,
//! a fresh model, and a fresh cluster assigner, runs to completion in memory,
//! and returns a report. Persisting the assigned class numbers is a separate
//! concern behind [`AssignmentSink`]; the engine never writes back itself.

use crate::cluster::KMeans;
use crate::error::{AsignarError, Result};
use crate::gnn::{GcnEncoder, TrainingMode};
use crate::graph::relationship_edges;
use crate::preprocessing::feature_matrix;
use crate::student::{AllocationReport, AssignedStudent, ClassAssignment, StudentRecord};
use crate::traits::UnsupervisedEstimator;
use crate::weights::WeightConfig;
use serde::{Deserialize, Serialize};

/// Receives computed assignments for durable storage.
///
/// Implemented by the caller's data-access collaborator. Keeping persistence
/// behind this seam keeps the engine testable without a live store.
pub trait AssignmentSink {
    /// Persists the given assignments.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store rejects the write.
    fn persist(&mut self, assignments: &[ClassAssignment]) -> Result<()>;
}

/// Tunables for one allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Hidden width of the embedding model.
    pub hidden_dim: usize,
    /// Embedding width fed to the cluster assigner.
    pub embed_dim: usize,
    /// Learning rate for affinity training.
    pub learning_rate: f32,
    /// Fixed training budget (optimizer steps).
    pub epochs: usize,
    /// Whether the encoder trains on the affinity objective.
    pub mode: TrainingMode,
    /// Seed for model initialization; `None` draws from entropy.
    pub embedding_seed: Option<u64>,
    /// Seed for centroid initialization.
    pub clustering_seed: u64,
    /// Cluster count used when the weight configuration requests none.
    pub default_clusters: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 32,
            embed_dim: 16,
            learning_rate: 0.01,
            epochs: 200,
            mode: TrainingMode::Affinity,
            embedding_seed: Some(42),
            clustering_seed: 42,
            default_clusters: 3,
        }
    }
}

/// Width of the per-student feature vector (academic, wellbeing, activity).
const FEATURE_CHANNELS: usize = 3;

/// The allocation engine.
///
/// # Examples
///
/// ```
/// use asignar::prelude::*;
///
/// let records = vec![
///     StudentRecord::new("a", "Ana", 80.0, 70.0).with_activity("sports"),
///     StudentRecord::new("b", "Ben", 40.0, 90.0),
///     StudentRecord::new("c", "Cleo", 60.0, 50.0).with_activity("sports"),
/// ];
/// let weights = WeightConfig::new().with_clusters(2);
///
/// let report = Allocator::new().run(&records, &weights).unwrap();
/// assert_eq!(report.classes, 2);
/// assert_eq!(report.assigned.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    config: AllocatorConfig,
}

impl Allocator {
    /// Creates an allocator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: AllocatorConfig::default(),
        }
    }

    /// Creates an allocator with the given configuration.
    #[must_use]
    pub fn with_config(config: AllocatorConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Effective cluster count for a batch of `n_students`.
    ///
    /// Never more clusters than students, never fewer than one.
    fn effective_clusters(&self, weights: &WeightConfig, n_students: usize) -> usize {
        weights
            .clusters
            .unwrap_or(self.config.default_clusters)
            .min(n_students)
            .max(1)
    }

    /// Runs the full allocation pipeline over a batch.
    ///
    /// # Errors
    ///
    /// Returns [`AsignarError::InsufficientData`] for an empty batch, and a
    /// reportable error if the embedding or clustering stage fails (for
    /// example on numerical instability). No recognized condition panics.
    pub fn run(
        &self,
        records: &[StudentRecord],
        weights: &WeightConfig,
    ) -> Result<AllocationReport> {
        if records.is_empty() {
            return Err(AsignarError::insufficient_data("student batch is empty"));
        }
        let n_students = records.len();

        let features = feature_matrix(records, weights)?;
        let edges = relationship_edges(records, weights);

        let mut encoder = GcnEncoder::new(
            FEATURE_CHANNELS,
            self.config.hidden_dim,
            self.config.embed_dim,
            self.config.embedding_seed,
        );
        if self.config.mode == TrainingMode::Affinity {
            encoder.train(
                &features,
                &edges,
                self.config.learning_rate,
                self.config.epochs,
            );
        }

        let embeddings = encoder.embed(&features, &edges);
        if embeddings.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(AsignarError::Other(
                "embedding model produced non-finite values".to_string(),
            ));
        }

        let classes = self.effective_clusters(weights, n_students);
        let mut kmeans = KMeans::new(classes).with_random_state(self.config.clustering_seed);
        kmeans.fit(&embeddings)?;
        let labels = kmeans.predict(&embeddings);

        let assigned = records
            .iter()
            .zip(labels.iter())
            .map(|(record, &label)| AssignedStudent {
                student_id: record.id.clone(),
                name: record.name.clone(),
                academic: record.academic,
                wellbeing: record.wellbeing,
                activity: record.activity_label(),
                class: label + 1,
            })
            .collect();

        tracing::info!(students = n_students, classes, "allocation complete");

        Ok(AllocationReport {
            message: "Allocation complete".to_string(),
            classes,
            assigned,
        })
    }

    /// Runs the pipeline and hands the assignments to `sink`.
    ///
    /// Convenience for callers that persist immediately; computation and
    /// persistence remain separately callable.
    ///
    /// # Errors
    ///
    /// Returns the first error from either the run or the sink.
    pub fn run_and_persist<S: AssignmentSink>(
        &self,
        records: &[StudentRecord],
        weights: &WeightConfig,
        sink: &mut S,
    ) -> Result<AllocationReport> {
        let report = self.run(records, weights)?;
        sink.persist(&report.assignments())?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_batch() -> Vec<StudentRecord> {
        vec![
            StudentRecord::new("a", "Ana", 80.0, 70.0).with_activity("sports"),
            StudentRecord::new("b", "Ben", 40.0, 90.0),
            StudentRecord::new("c", "Cleo", 60.0, 50.0).with_activity("sports"),
        ]
    }

    #[test]
    fn test_empty_batch_is_insufficient_data() {
        let result = Allocator::new().run(&[], &WeightConfig::new());
        assert!(matches!(
            result,
            Err(AsignarError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_single_student_gets_class_one() {
        let records = vec![StudentRecord::new("a", "Ana", 80.0, 70.0)];
        let report = Allocator::new().run(&records, &WeightConfig::new()).unwrap();

        assert_eq!(report.classes, 1);
        assert_eq!(report.assigned.len(), 1);
        assert_eq!(report.assigned[0].class, 1);
    }

    #[test]
    fn test_example_scenario_two_classes() {
        let weights = WeightConfig::new().with_clusters(2);
        let report = Allocator::new().run(&example_batch(), &weights).unwrap();

        assert_eq!(report.classes, 2);
        assert_eq!(report.assigned.len(), 3);

        let mut distinct: Vec<usize> = report.assigned.iter().map(|a| a.class).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 2);
        for a in &report.assigned {
            assert!(a.class == 1 || a.class == 2);
        }
    }

    #[test]
    fn test_default_cluster_count_caps_at_batch_size() {
        // Default of 3 clusters, but only 2 students
        let records = vec![
            StudentRecord::new("a", "Ana", 80.0, 70.0),
            StudentRecord::new("b", "Ben", 40.0, 90.0),
        ];
        let report = Allocator::new().run(&records, &WeightConfig::new()).unwrap();
        assert_eq!(report.classes, 2);
    }

    #[test]
    fn test_requested_zero_clusters_coerces_to_one() {
        let weights = WeightConfig {
            clusters: Some(0),
            ..WeightConfig::new()
        };
        let report = Allocator::new().run(&example_batch(), &weights).unwrap();
        assert_eq!(report.classes, 1);
        assert!(report.assigned.iter().all(|a| a.class == 1));
    }

    #[test]
    fn test_class_numbers_in_range() {
        let weights = WeightConfig::new().with_clusters(2);
        let report = Allocator::new().run(&example_batch(), &weights).unwrap();
        for a in &report.assigned {
            assert!((1..=report.classes).contains(&a.class));
        }
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let weights = WeightConfig::new().with_clusters(2);
        let batch = example_batch();

        let first = Allocator::new().run(&batch, &weights).unwrap();
        let second = Allocator::new().run(&batch, &weights).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_report_preserves_original_attributes() {
        let report = Allocator::new()
            .run(&example_batch(), &WeightConfig::new())
            .unwrap();

        assert_eq!(report.assigned[0].student_id, "a");
        assert_eq!(report.assigned[0].name, "Ana");
        assert_eq!(report.assigned[0].academic, 80.0);
        assert_eq!(report.assigned[0].wellbeing, 70.0);
        assert_eq!(report.assigned[0].activity, "sports");
        assert_eq!(report.assigned[1].activity, "none");
    }

    #[test]
    fn test_frozen_mode_skips_training() {
        let batch = vec![
            StudentRecord::new("a", "Ana", 80.0, 70.0).with_friends("Ben"),
            StudentRecord::new("b", "Ben", 40.0, 90.0).with_friends("Ana"),
            StudentRecord::new("c", "Cleo", 60.0, 50.0),
        ];
        let weights = WeightConfig::new().with_clusters(2);

        // Zero-weight friend edges keep the graph structure but give the
        // affinity objective nothing to train on, so an Affinity run over
        // them must equal a Frozen run over the weighted edges.
        let frozen = Allocator::with_config(AllocatorConfig {
            mode: TrainingMode::Frozen,
            ..AllocatorConfig::default()
        })
        .run(&batch, &weights)
        .unwrap();

        let untrainable = Allocator::new()
            .run(&batch, &weights.clone().with_friends(0.0))
            .unwrap();

        assert_eq!(frozen, untrainable);
    }

    struct RecordingSink {
        rows: Vec<ClassAssignment>,
    }

    impl AssignmentSink for RecordingSink {
        fn persist(&mut self, assignments: &[ClassAssignment]) -> crate::error::Result<()> {
            self.rows.extend_from_slice(assignments);
            Ok(())
        }
    }

    #[test]
    fn test_run_and_persist_hands_assignments_to_sink() {
        let mut sink = RecordingSink { rows: Vec::new() };
        let weights = WeightConfig::new().with_clusters(2);

        let report = Allocator::new()
            .run_and_persist(&example_batch(), &weights, &mut sink)
            .unwrap();

        assert_eq!(sink.rows.len(), 3);
        assert_eq!(sink.rows, report.assignments());
    }

    struct FailingSink;

    impl AssignmentSink for FailingSink {
        fn persist(&mut self, _assignments: &[ClassAssignment]) -> crate::error::Result<()> {
            Err("store unavailable".into())
        }
    }

    #[test]
    fn test_run_and_persist_propagates_sink_error() {
        let result = Allocator::new().run_and_persist(
            &example_batch(),
            &WeightConfig::new(),
            &mut FailingSink,
        );
        assert!(result.is_err());
    }
}
