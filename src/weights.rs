//! Weight configuration for allocation runs.
//!
//! A [`WeightConfig`] is supplied fresh per run. Each multiplier defaults to
//! 1.0; the cluster count defaults at the use site (see
//! [`crate::allocate::AllocatorConfig::default_clusters`]). The boundary
//! constructor [`WeightConfig::from_json`] coerces loose request data once,
//! so nothing downstream ever revalidates weights: missing keys, garbage
//! values, and non-finite numbers silently fall back to defaults, and
//! unrecognized keys are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_weight() -> f32 {
    1.0
}

/// Per-channel multipliers and the optional requested cluster count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    /// Multiplier for the standardized academic channel.
    #[serde(default = "default_weight")]
    pub academic: f32,
    /// Multiplier for the standardized wellbeing channel.
    #[serde(default = "default_weight")]
    pub wellbeing: f32,
    /// Multiplier for the encoded activity channel.
    #[serde(default = "default_weight")]
    pub activities: f32,
    /// Weight applied to friend edges.
    #[serde(default = "default_weight")]
    pub friends: f32,
    /// Weight applied (negated) to conflict edges.
    #[serde(default = "default_weight")]
    pub disrespect: f32,
    /// Requested cluster count; `None` means the engine default.
    #[serde(default)]
    pub clusters: Option<usize>,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightConfig {
    /// All multipliers at 1.0 and no requested cluster count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            academic: 1.0,
            wellbeing: 1.0,
            activities: 1.0,
            friends: 1.0,
            disrespect: 1.0,
            clusters: None,
        }
    }

    /// Sets the academic multiplier.
    #[must_use]
    pub fn with_academic(mut self, weight: f32) -> Self {
        self.academic = weight;
        self
    }

    /// Sets the wellbeing multiplier.
    #[must_use]
    pub fn with_wellbeing(mut self, weight: f32) -> Self {
        self.wellbeing = weight;
        self
    }

    /// Sets the activities multiplier.
    #[must_use]
    pub fn with_activities(mut self, weight: f32) -> Self {
        self.activities = weight;
        self
    }

    /// Sets the friend-edge weight.
    #[must_use]
    pub fn with_friends(mut self, weight: f32) -> Self {
        self.friends = weight;
        self
    }

    /// Sets the conflict-edge weight (applied negated).
    #[must_use]
    pub fn with_disrespect(mut self, weight: f32) -> Self {
        self.disrespect = weight;
        self
    }

    /// Sets the requested cluster count.
    #[must_use]
    pub fn with_clusters(mut self, clusters: usize) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Builds a configuration from a loose JSON object.
    ///
    /// Every recognized key is coerced independently; any value that is not
    /// a finite number (or a string parseable as one) falls back to its
    /// default. A non-object value yields the full default configuration.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::new();
        };

        Self {
            academic: coerce_weight(obj.get("academic")),
            wellbeing: coerce_weight(obj.get("wellbeing")),
            activities: coerce_weight(obj.get("activities")),
            friends: coerce_weight(obj.get("friends")),
            disrespect: coerce_weight(obj.get("disrespect")),
            clusters: coerce_clusters(obj.get("clusters")),
        }
    }
}

fn coerce_weight(value: Option<&Value>) -> f32 {
    let Some(v) = value else {
        return default_weight();
    };

    let parsed = match v {
        Value::Number(n) => n.as_f64().map(|x| x as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    };

    match parsed {
        Some(w) if w.is_finite() => w,
        _ => default_weight(),
    }
}

fn coerce_clusters(value: Option<&Value>) -> Option<usize> {
    let v = value?;

    let parsed = match v {
        Value::Number(n) => n.as_u64().map(|k| k as usize),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };

    // Zero is not a usable cluster count; treat it like a missing key.
    parsed.filter(|&k| k > 0)
}
