//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use asignar::prelude::*;
//! ```

pub use crate::allocate::{Allocator, AllocatorConfig, AssignmentSink};
pub use crate::cluster::KMeans;
pub use crate::error::{AsignarError, Result};
pub use crate::gnn::{GcnEncoder, TrainingMode};
pub use crate::graph::{relationship_edges, RelationshipEdge};
pub use crate::preprocessing::{feature_matrix, ActivityEncoder, StandardScaler};
pub use crate::primitives::{Matrix, Vector};
pub use crate::student::{
    AllocationReport, AssignedStudent, ClassAssignment, StudentRecord,
};
pub use crate::traits::{Transformer, UnsupervisedEstimator};
pub use crate::weights::WeightConfig;
