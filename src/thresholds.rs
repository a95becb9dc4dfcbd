//! Threshold validation and ordering.

use serde::{Deserialize, Serialize};

use crate::error::{OrganizerError, Result};

/// Closed range of values a score (and therefore a threshold) may take.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ScoreDomain {
    pub min: f64,
    pub max: f64,
}

impl ScoreDomain {
    pub const UNIT: ScoreDomain = ScoreDomain { min: 0.0, max: 1.0 };

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for ScoreDomain {
    fn default() -> Self {
        Self::UNIT
    }
}

impl From<[f64; 2]> for ScoreDomain {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<ScoreDomain> for [f64; 2] {
    fn from(d: ScoreDomain) -> Self {
        [d.min, d.max]
    }
}

/// Returns `raw` sorted ascending with duplicates removed.
///
/// An empty input is valid and yields an empty set (a single catch-all bucket).
pub fn normalize_thresholds(raw: &[f64], domain: ScoreDomain) -> Result<Vec<f64>> {
    if !(domain.min.is_finite() && domain.max.is_finite()) || domain.min > domain.max {
        return Err(OrganizerError::Configuration(format!(
            "score domain [{}, {}] is not a valid range",
            domain.min, domain.max
        )));
    }

    for &value in raw {
        if !value.is_finite() {
            return Err(OrganizerError::InvalidThreshold {
                value,
                reason: "not a finite number".to_string(),
            });
        }
        if !domain.contains(value) {
            return Err(OrganizerError::InvalidThreshold {
                value,
                reason: format!("outside score domain [{}, {}]", domain.min, domain.max),
            });
        }
    }

    let mut sorted = raw.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    Ok(sorted)
}
