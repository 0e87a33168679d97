//! Relationship graph construction from free-text friend/conflict lists.
//!
//! Each populated list field is split on commas and every name is resolved
//! against the batch by exact, case-sensitive match on the `name` field.
//! Friend mentions become positive-weight edges, conflict mentions become
//! negative-weight edges, and names with no match are silently dropped. The
//! edge list is rebuilt from scratch on every run.

use crate::student::StudentRecord;
use crate::weights::WeightConfig;

/// A directed, signed link between two students (by batch index).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationshipEdge {
    /// Index of the student who declared the relation.
    pub source: usize,
    /// Index of the named student.
    pub target: usize,
    /// Positive for friends, negative for conflicts.
    pub weight: f32,
}

/// Extracts the signed edge list for a batch.
///
/// A relation is directed (declared by the source student); a reverse
/// mention, if present, contributes its own independent edge. Duplicate
/// names resolve to the first matching student in batch order.
#[must_use]
pub fn relationship_edges(
    records: &[StudentRecord],
    weights: &WeightConfig,
) -> Vec<RelationshipEdge> {
    let mut edges = Vec::new();

    for (source, record) in records.iter().enumerate() {
        if let Some(friends) = record.friends.as_deref() {
            for name in split_names(friends) {
                if let Some(target) = resolve_name(records, name) {
                    edges.push(RelationshipEdge {
                        source,
                        target,
                        weight: weights.friends,
                    });
                }
            }
        }

        if let Some(conflicts) = record.conflicts.as_deref() {
            for name in split_names(conflicts) {
                if let Some(target) = resolve_name(records, name) {
                    edges.push(RelationshipEdge {
                        source,
                        target,
                        weight: -weights.disrespect,
                    });
                }
            }
        }
    }

    tracing::debug!(edges = edges.len(), "relationship graph built");

    edges
}

fn split_names(field: &str) -> impl Iterator<Item = &str> {
    field.split(',').map(str::trim).filter(|name| !name.is_empty())
}

fn resolve_name(records: &[StudentRecord], name: &str) -> Option<usize> {
    records.iter().position(|record| record.name == name)
}
