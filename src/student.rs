//! Data model for allocation runs.
//!
//! A [`StudentRecord`] is read once per run from the caller's store and never
//! mutated by the engine. The engine returns [`AllocationReport`] /
//! [`ClassAssignment`] values; writing class numbers back to durable storage
//! is the caller's job (see [`crate::allocate::AssignmentSink`]).

use serde::{Deserialize, Serialize};

/// Sentinel category for students with no activity on record.
pub const NO_ACTIVITY: &str = "none";

/// One student as seen by the allocation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Opaque, stable, unique identifier.
    pub id: String,
    /// Display name; relationship lists refer to students by this field.
    pub name: String,
    /// Academic score.
    pub academic: f32,
    /// Wellbeing score.
    pub wellbeing: f32,
    /// Activity label; absent or empty means no activity.
    #[serde(default)]
    pub activity: Option<String>,
    /// Comma-separated display names of declared friends.
    #[serde(default)]
    pub friends: Option<String>,
    /// Comma-separated display names of declared conflicts.
    #[serde(default)]
    pub conflicts: Option<String>,
}

impl StudentRecord {
    /// Creates a record with no activity or relationship data.
    #[must_use]
    pub fn new(id: &str, name: &str, academic: f32, wellbeing: f32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            academic,
            wellbeing,
            activity: None,
            friends: None,
            conflicts: None,
        }
    }

    /// Sets the activity label.
    #[must_use]
    pub fn with_activity(mut self, activity: &str) -> Self {
        self.activity = Some(activity.to_string());
        self
    }

    /// Sets the comma-separated friends list.
    #[must_use]
    pub fn with_friends(mut self, friends: &str) -> Self {
        self.friends = Some(friends.to_string());
        self
    }

    /// Sets the comma-separated conflicts list.
    #[must_use]
    pub fn with_conflicts(mut self, conflicts: &str) -> Self {
        self.conflicts = Some(conflicts.to_string());
        self
    }

    /// The activity label used for encoding: trimmed, with absent or empty
    /// labels normalized to the [`NO_ACTIVITY`] sentinel.
    #[must_use]
    pub fn activity_label(&self) -> String {
        self.activity
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_ACTIVITY)
            .to_string()
    }
}

/// The minimal output entity: which class a student was assigned to.
///
/// Class numbers are 1-based and contiguous within a run. Cluster label
/// identity is arbitrary per run; class 1 in one run bears no relation to
/// class 1 in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAssignment {
    /// Student identifier.
    pub student_id: String,
    /// Assigned class number (1-based).
    pub class: usize,
}

/// A per-student result row: the original attributes plus the assigned class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedStudent {
    /// Student identifier.
    pub student_id: String,
    /// Display name.
    pub name: String,
    /// Academic score as supplied.
    pub academic: f32,
    /// Wellbeing score as supplied.
    pub wellbeing: f32,
    /// Normalized activity label (absent → "none").
    pub activity: String,
    /// Assigned class number (1-based).
    pub class: usize,
}

/// Result of a successful allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    /// Human-readable summary.
    pub message: String,
    /// Effective cluster count used for this run.
    pub classes: usize,
    /// One row per student, in batch order.
    pub assigned: Vec<AssignedStudent>,
}

impl AllocationReport {
    /// Projects the report down to the persistable assignments.
    #[must_use]
    pub fn assignments(&self) -> Vec<ClassAssignment> {
        self.assigned
            .iter()
            .map(|a| ClassAssignment {
                student_id: a.student_id.clone(),
                class: a.class,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_label_present() {
        let s = StudentRecord::new("s1", "Ana", 80.0, 70.0).with_activity("sports");
        assert_eq!(s.activity_label(), "sports");
    }

    #[test]
    fn test_activity_label_absent_is_sentinel() {
        let s = StudentRecord::new("s1", "Ana", 80.0, 70.0);
        assert_eq!(s.activity_label(), NO_ACTIVITY);
    }

    #[test]
    fn test_activity_label_empty_is_sentinel() {
        let s = StudentRecord::new("s1", "Ana", 80.0, 70.0).with_activity("   ");
        assert_eq!(s.activity_label(), NO_ACTIVITY);
    }

    #[test]
    fn test_record_roundtrip_json() {
        let s = StudentRecord::new("s1", "Ana", 80.0, 70.0)
            .with_activity("music")
            .with_friends("Ben, Cleo");
        let json = serde_json::to_string(&s).unwrap();
        let back: StudentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_record_deserializes_without_optional_fields() {
        let json = r#"{"id":"s1","name":"Ana","academic":80.0,"wellbeing":70.0}"#;
        let s: StudentRecord = serde_json::from_str(json).unwrap();
        assert!(s.activity.is_none());
        assert!(s.friends.is_none());
        assert!(s.conflicts.is_none());
    }

    #[test]
    fn test_report_assignments_projection() {
        let report = AllocationReport {
            message: "ok".to_string(),
            classes: 2,
            assigned: vec![AssignedStudent {
                student_id: "s1".to_string(),
                name: "Ana".to_string(),
                academic: 80.0,
                wellbeing: 70.0,
                activity: "none".to_string(),
                class: 2,
            }],
        };
        let assignments = report.assignments();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].student_id, "s1");
        assert_eq!(assignments[0].class, 2);
    }
}
