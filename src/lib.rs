//! Asignar: student-to-class allocation engine in pure Rust.
//!
//! Asignar combines tabular student attributes (academic score, wellbeing
//! score, activity category) with an optional social relationship graph
//! (friends/conflicts) and produces balanced class groupings via learned
//! graph embeddings and centroid clustering.
//!
//! # Pipeline
//!
//! ```text
//! StudentRecords ──► Feature Normalizer ──► weighted feature matrix ─┐
//!        │                                                           ▼
//!        └─────────► Relationship Graph ──► signed edge list ──► GCN Encoder
//!                                                                    │
//!                                                               embeddings
//!                                                                    ▼
//!                                            ClassAssignments ◄── K-Means
//! ```
//!
//! # Quick Start
//!
//! ```
//! use asignar::prelude::*;
//!
//! let records = vec![
//!     StudentRecord::new("a", "Ana", 80.0, 70.0)
//!         .with_activity("sports")
//!         .with_friends("Cleo"),
//!     StudentRecord::new("b", "Ben", 40.0, 90.0),
//!     StudentRecord::new("c", "Cleo", 60.0, 50.0).with_activity("sports"),
//! ];
//! let weights = WeightConfig::new().with_clusters(2);
//!
//! let report = Allocator::new().run(&records, &weights).unwrap();
//! assert_eq!(report.classes, 2);
//! assert_eq!(report.assigned.len(), 3);
//! for student in &report.assigned {
//!     assert!(student.class >= 1 && student.class <= 2);
//! }
//! ```
//!
//! # Modules
//!
//! - [`allocate`]: The orchestrator and the persistence seam
//! - [`cluster`]: Seeded K-Means cluster assignment
//! - [`error`]: Error types and the crate `Result` alias
//! - [`gnn`]: Two-layer graph-convolutional embedding model
//! - [`graph`]: Relationship-edge extraction from friend/conflict lists
//! - [`optim`]: Adam optimizer for embedding training
//! - [`preprocessing`]: Feature standardization, encoding, and weighting
//! - [`primitives`]: Core Vector and Matrix types
//! - [`student`]: Data model (records, assignments, reports)
//! - [`weights`]: Per-run weight configuration with lenient coercion
//!
//! # Determinism
//!
//! A run is deterministic given fixed inputs and the seeds in
//! [`allocate::AllocatorConfig`]: the embedding seed fixes model
//! initialization and the clustering seed fixes centroid initialization.
//! Every run builds fresh state, so concurrent runs share nothing.

pub mod allocate;
pub mod cluster;
pub mod error;
pub mod gnn;
pub mod graph;
pub mod optim;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod student;
pub mod traits;
pub mod weights;
