//! Per-bucket bookkeeping and the JSON metadata persisted at the end of a run.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OrganizerError, Result};

pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const SUMMARY_FILE_NAME: &str = "organization_summary.json";

/// Contents of `<output_root>/<label>/metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub label: String,
    pub count: usize,
    pub score_min: f64,
    pub score_max: f64,
    pub avg_score: f64,
    pub image_paths: Vec<PathBuf>,
}

/// Contents of `<output_root>/organization_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_processed: usize,
    pub total_failed: usize,
    pub buckets: Vec<BucketSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub label: String,
    pub count: usize,
    /// `None` for a bucket that received no images.
    pub score_range: Option<(f64, f64)>,
    pub avg_score: Option<f64>,
}

#[derive(Debug, Clone)]
struct BucketStats {
    label: String,
    score_min: f64,
    score_max: f64,
    score_sum: f64,
    image_paths: Vec<PathBuf>,
}

impl BucketStats {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            score_min: f64::INFINITY,
            score_max: f64::NEG_INFINITY,
            score_sum: 0.0,
            image_paths: Vec::new(),
        }
    }

    fn count(&self) -> usize {
        self.image_paths.len()
    }

    fn summary(&self) -> BucketSummary {
        let count = self.count();
        BucketSummary {
            label: self.label.clone(),
            count,
            score_range: (count > 0).then_some((self.score_min, self.score_max)),
            avg_score: (count > 0).then(|| self.score_sum / count as f64),
        }
    }

    fn metadata(&self) -> Option<FolderMetadata> {
        let count = self.count();
        (count > 0).then(|| FolderMetadata {
            label: self.label.clone(),
            count,
            score_min: self.score_min,
            score_max: self.score_max,
            avg_score: self.score_sum / count as f64,
            image_paths: self.image_paths.clone(),
        })
    }
}

/// Accumulates classified images per bucket, preserving label order.
#[derive(Debug, Clone)]
pub struct OrganizationStats {
    buckets: Vec<BucketStats>,
    failed: usize,
}

impl OrganizationStats {
    pub fn new(labels: &[String]) -> Self {
        Self {
            buckets: labels.iter().map(|l| BucketStats::new(l)).collect(),
            failed: 0,
        }
    }

    /// Adds one image to `label`'s bucket.
    pub fn record(&mut self, label: &str, score: f64, image_path: impl Into<PathBuf>) -> Result<()> {
        let bucket = self
            .buckets
            .iter_mut()
            .find(|b| b.label == label)
            .ok_or_else(|| OrganizerError::Configuration(format!("unknown bucket {label:?}")))?;
        bucket.score_min = bucket.score_min.min(score);
        bucket.score_max = bucket.score_max.max(score);
        bucket.score_sum += score;
        bucket.image_paths.push(image_path.into());
        Ok(())
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total_processed(&self) -> usize {
        self.buckets.iter().map(BucketStats::count).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.failed
    }

    pub fn image_paths(&self, label: &str) -> &[PathBuf] {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.image_paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn summary(&self) -> Vec<BucketSummary> {
        self.buckets.iter().map(BucketStats::summary).collect()
    }

    pub fn run_summary(&self) -> RunSummary {
        RunSummary {
            total_processed: self.total_processed(),
            total_failed: self.failed,
            buckets: self.summary(),
        }
    }

    /// Metadata for every non-empty bucket.
    pub fn folder_metadata(&self) -> Vec<FolderMetadata> {
        self.buckets.iter().filter_map(BucketStats::metadata).collect()
    }

    /// Plain-text table of the per-bucket counts and score ranges.
    pub fn render_summary(&self) -> String {
        let width = self
            .buckets
            .iter()
            .map(|b| b.label.len())
            .max()
            .unwrap_or(0)
            .max("bucket".len());

        let mut out = String::new();
        let _ = writeln!(out, "{:<width$}  {:>6}  {:>8}  {:>8}  {:>8}", "bucket", "count", "min", "max", "avg");
        for s in self.summary() {
            match (s.score_range, s.avg_score) {
                (Some((lo, hi)), Some(avg)) => {
                    let _ = writeln!(
                        out,
                        "{:<width$}  {:>6}  {:>8.4}  {:>8.4}  {:>8.4}",
                        s.label, s.count, lo, hi, avg
                    );
                }
                _ => {
                    let _ = writeln!(out, "{:<width$}  {:>6}  {:>8}  {:>8}  {:>8}", s.label, 0, "-", "-", "-");
                }
            }
        }
        let _ = writeln!(
            out,
            "total: {} organized, {} failed",
            self.total_processed(),
            self.failed
        );
        out
    }

    /// Rewrites `metadata.json` in every non-empty bucket folder plus the run
    /// summary at the root, and removes the file left in an empty bucket's
    /// folder by an earlier run. Returns the files written.
    pub fn write_metadata(&self, output_root: &Path) -> Result<Vec<PathBuf>> {
        for bucket in self.buckets.iter().filter(|b| b.image_paths.is_empty()) {
            let stale = output_root.join(&bucket.label).join(METADATA_FILE_NAME);
            if remove_if_present(&stale)? {
                tracing::debug!(path = %stale.display(), "removed stale metadata");
            }
        }

        let mut written = Vec::new();
        for meta in self.folder_metadata() {
            let folder = output_root.join(&meta.label);
            fs::create_dir_all(&folder)?;
            let path = folder.join(METADATA_FILE_NAME);
            fs::write(&path, serde_json::to_string_pretty(&meta)?)?;
            written.push(path);
        }

        fs::create_dir_all(output_root)?;
        let summary_path = output_root.join(SUMMARY_FILE_NAME);
        fs::write(&summary_path, serde_json::to_string_pretty(&self.run_summary())?)?;
        written.push(summary_path);
        Ok(written)
    }
}

/// Removes `path`, treating a missing file as already removed. Returns
/// whether a file was deleted.
pub(crate) fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Reads `<folder>/metadata.json`.
pub fn read_metadata(folder: &Path) -> Result<FolderMetadata> {
    let text = fs::read_to_string(folder.join(METADATA_FILE_NAME))?;
    Ok(serde_json::from_str(&text)?)
}

/// Reads every bucket's metadata under `output_root`, sorted by label.
pub fn read_all_metadata(output_root: &Path) -> Result<Vec<FolderMetadata>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(output_root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && path.join(METADATA_FILE_NAME).is_file() {
            out.push(read_metadata(&path)?);
        }
    }
    out.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> OrganizationStats {
        OrganizationStats::new(&["low".to_string(), "high".to_string()])
    }

    #[test]
    fn record_tracks_range_and_average() {
        let mut s = stats();
        s.record("low", 0.2, "a.png").unwrap();
        s.record("low", 0.1, "b.png").unwrap();
        s.record("high", 0.9, "c.png").unwrap();

        let summary = s.summary();
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].score_range, Some((0.1, 0.2)));
        assert!((summary[0].avg_score.unwrap() - 0.15).abs() < 1e-12);
        assert_eq!(summary[1].score_range, Some((0.9, 0.9)));
        assert_eq!(s.total_processed(), 3);
    }

    #[test]
    fn empty_buckets_have_no_range_or_metadata() {
        let mut s = stats();
        s.record("high", 0.8, "x.png").unwrap();
        assert_eq!(s.summary()[0].score_range, None);
        let meta = s.folder_metadata();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].label, "high");
    }

    #[test]
    fn write_metadata_drops_files_of_emptied_buckets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut first = stats();
        first.record("high", 0.9, "a.png").unwrap();
        first.write_metadata(dir.path()).expect("write");
        assert!(dir.path().join("high").join(METADATA_FILE_NAME).is_file());

        let mut second = stats();
        second.record("low", 0.1, "b.png").unwrap();
        second.write_metadata(dir.path()).expect("write");

        assert!(!dir.path().join("high").join(METADATA_FILE_NAME).exists());
        let labels: Vec<String> = read_all_metadata(dir.path())
            .expect("read")
            .into_iter()
            .map(|m| m.label)
            .collect();
        assert_eq!(labels, vec!["low"]);
    }

    #[test]
    fn unknown_label_rejected() {
        assert!(stats().record("mid", 0.5, "x.png").is_err());
    }

    #[test]
    fn summary_table_lists_every_bucket() {
        let mut s = stats();
        s.record("low", 0.25, "a.png").unwrap();
        s.record_failure();
        let text = s.render_summary();
        assert!(text.contains("low"));
        assert!(text.contains("0.2500"));
        assert!(text.contains("high"));
        assert!(text.contains("1 organized, 1 failed"));
    }
}
