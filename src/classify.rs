//! Maps anomaly scores to bucket labels.
//!
//! Thresholds are upper exclusive bounds: a score equal to a threshold lands in
//! the bucket above it. The last bucket is closed on both ends.

use crate::error::{OrganizerError, Result};
use crate::thresholds::{ScoreDomain, normalize_thresholds};

/// Returns the label of the bucket `score` falls into.
///
/// `sorted_thresholds` must already be normalized; `bucket_labels` must hold
/// exactly one more entry than there are thresholds.
pub fn classify<'a>(
    score: f64,
    sorted_thresholds: &[f64],
    bucket_labels: &'a [String],
) -> Result<&'a str> {
    if bucket_labels.len() != sorted_thresholds.len() + 1 {
        return Err(OrganizerError::Configuration(format!(
            "{} thresholds need {} bucket labels, got {}",
            sorted_thresholds.len(),
            sorted_thresholds.len() + 1,
            bucket_labels.len()
        )));
    }
    if !score.is_finite() {
        return Err(OrganizerError::InvalidScore(score));
    }

    let idx = sorted_thresholds
        .iter()
        .position(|&t| score < t)
        .unwrap_or(sorted_thresholds.len());
    Ok(&bucket_labels[idx])
}

/// A validated pairing of normalized thresholds and their bucket labels.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketScheme {
    thresholds: Vec<f64>,
    labels: Vec<String>,
    domain: ScoreDomain,
}

impl BucketScheme {
    /// Normalizes `raw_thresholds` and checks `labels` against them. An empty
    /// label list asks for generated labels (see [`default_labels`]).
    pub fn new(raw_thresholds: &[f64], labels: &[String], domain: ScoreDomain) -> Result<Self> {
        let thresholds = normalize_thresholds(raw_thresholds, domain)?;
        let labels = if labels.is_empty() {
            default_labels(&thresholds)
        } else {
            labels.to_vec()
        };

        if labels.len() != thresholds.len() + 1 {
            return Err(OrganizerError::Configuration(format!(
                "{} distinct thresholds need {} bucket labels, got {}",
                thresholds.len(),
                thresholds.len() + 1,
                labels.len()
            )));
        }
        for (i, label) in labels.iter().enumerate() {
            validate_label(label)?;
            if labels[..i].contains(label) {
                return Err(OrganizerError::Configuration(format!(
                    "duplicate bucket label {label:?}"
                )));
            }
        }

        Ok(Self {
            thresholds,
            labels,
            domain,
        })
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn classify(&self, score: f64) -> Result<&str> {
        if score.is_finite() && !self.domain.contains(score) {
            tracing::debug!(score, "score lies outside the configured domain");
        }
        classify(score, &self.thresholds, &self.labels)
    }
}

/// Labels derived from the threshold values: `below_<t>` for every bounded
/// bucket and `at_least_<t>` for the last one, or `all` without thresholds.
pub fn default_labels(sorted_thresholds: &[f64]) -> Vec<String> {
    let Some(&last) = sorted_thresholds.last() else {
        return vec!["all".to_string()];
    };
    sorted_thresholds
        .iter()
        .map(|&t| format!("below_{}", format_threshold(t)))
        .chain(std::iter::once(format!("at_least_{}", format_threshold(last))))
        .collect()
}

fn format_threshold(t: f64) -> String {
    let mut s = format!("{t}");
    match s.find('.') {
        Some(dot) => {
            let decimals = s.len() - dot - 1;
            for _ in decimals..2 {
                s.push('0');
            }
        }
        None => s.push_str(".00"),
    }
    s
}

fn validate_label(label: &str) -> Result<()> {
    let bad = label.trim().is_empty()
        || label == "."
        || label == ".."
        || label.contains(['/', '\\'])
        || label.contains('\0');
    if bad {
        return Err(OrganizerError::Configuration(format!(
            "bucket label {label:?} cannot be used as a folder name"
        )));
    }
    Ok(())
}
