//! Runs a full organization pass: classify, relocate, persist, render posters.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;

use crate::config::OrganizerConfig;
use crate::error::{OrganizerError, Result};
use crate::poster::{ImageCache, PosterOptions, poster_path, write_bucket_poster};
use crate::predictions::{PredictionResult, Predictor, load_image_list};
use crate::relocate::relocate;
use crate::stats::{OrganizationStats, remove_if_present};

/// An image that could not be organized, and why.
#[derive(Debug)]
pub struct ItemFailure {
    pub image_path: PathBuf,
    pub error: OrganizerError,
}

#[derive(Debug)]
pub struct OrganizeReport {
    pub stats: OrganizationStats,
    pub relocated: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    pub metadata_files: Vec<PathBuf>,
    pub posters: Vec<PathBuf>,
    pub bytes_relocated: u64,
}

/// Sorts already-scored images into `<output_root>/<bucket>/`.
///
/// Configuration problems abort before any file is touched. Per-image
/// failures are logged, collected in the report, and do not stop the run.
pub fn organize_by_score(
    predictions: &[PredictionResult],
    output_root: &Path,
    config: &OrganizerConfig,
) -> Result<OrganizeReport> {
    organize_with_failures(predictions, Vec::new(), output_root, config)
}

fn organize_with_failures(
    predictions: &[PredictionResult],
    mut failures: Vec<ItemFailure>,
    output_root: &Path,
    config: &OrganizerConfig,
) -> Result<OrganizeReport> {
    let scheme = config.validate()?;
    let poster_options = if config.render_posters {
        Some(config.poster_options()?)
    } else {
        None
    };

    tracing::info!(
        images = predictions.len(),
        thresholds = ?scheme.thresholds(),
        labels = ?scheme.labels(),
        mode = config.relocation_mode.verb(),
        output = %output_root.display(),
        "organizing images by anomaly score"
    );

    let mut stats = OrganizationStats::new(scheme.labels());
    for _ in &failures {
        stats.record_failure();
    }
    let mut relocated = Vec::new();
    let mut bytes_relocated = 0u64;

    for prediction in predictions {
        let src = &prediction.image_path;
        let outcome = scheme.classify(prediction.anomaly_score).and_then(|label| {
            let dest = relocate(src, &output_root.join(label), config.relocation_mode)?;
            Ok((label.to_string(), dest))
        });

        match outcome {
            Ok((label, dest)) => {
                tracing::debug!(
                    src = %src.display(),
                    dest = %dest.display(),
                    score = prediction.anomaly_score,
                    bucket = %label,
                    "organized image"
                );
                bytes_relocated += std::fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
                stats.record(&label, prediction.anomaly_score, &dest)?;
                relocated.push(dest);
            }
            Err(error) => {
                tracing::warn!(path = %src.display(), error = %error, "skipping image");
                stats.record_failure();
                failures.push(ItemFailure {
                    image_path: src.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        organized = relocated.len(),
        failed = failures.len(),
        size = %ByteSize(bytes_relocated),
        "relocation finished"
    );

    let metadata_files = if config.save_metadata {
        let files = stats.write_metadata(output_root)?;
        tracing::info!(files = files.len(), "wrote metadata");
        files
    } else {
        Vec::new()
    };

    let posters = match poster_options {
        Some(options) => {
            let buckets: Vec<(String, Vec<PathBuf>)> = scheme
                .labels()
                .iter()
                .map(|l| (l.clone(), stats.image_paths(l).to_vec()))
                .collect();
            render_posters(&buckets, output_root, &options, config)?
        }
        None => Vec::new(),
    };

    Ok(OrganizeReport {
        stats,
        relocated,
        failures,
        metadata_files,
        posters,
        bytes_relocated,
    })
}

/// Reads the manifest, scores it with `predictor`, and organizes the result.
/// Manifest entries the predictor returns no score for are reported as
/// failures.
pub fn predict_and_organize(
    manifest: &Path,
    predictor: &mut dyn Predictor,
    output_root: &Path,
    config: &OrganizerConfig,
) -> Result<OrganizeReport> {
    config.validate()?;
    let images = load_image_list(manifest)?;
    tracing::info!(manifest = %manifest.display(), images = images.len(), "loaded image list");

    let predictions = predictor.predict(manifest, &images)?;
    let scored: HashSet<&Path> = predictions.iter().map(|p| p.image_path.as_path()).collect();
    let missing: Vec<ItemFailure> = images
        .iter()
        .filter(|p| !scored.contains(p.as_path()))
        .map(|p| {
            tracing::warn!(path = %p.display(), "no anomaly score returned");
            ItemFailure {
                image_path: p.clone(),
                error: OrganizerError::MissingScore(p.clone()),
            }
        })
        .collect();

    organize_with_failures(&predictions, missing, output_root, config)
}

/// Writes one poster per non-empty bucket and deletes the poster an earlier
/// run left for a bucket that is now empty. A bucket whose poster cannot be
/// written is logged and skipped.
pub fn render_posters(
    buckets: &[(String, Vec<PathBuf>)],
    output_root: &Path,
    options: &PosterOptions,
    config: &OrganizerConfig,
) -> Result<Vec<PathBuf>> {
    let annotator = config.annotator();
    let mut cache = ImageCache::new(config.cache_loaded_images);
    let mut written = Vec::new();

    for (label, paths) in buckets {
        if paths.is_empty() {
            let stale = poster_path(output_root, label);
            if remove_if_present(&stale)? {
                tracing::debug!(bucket = %label, path = %stale.display(), "removed stale poster");
            }
            continue;
        }
        match write_bucket_poster(label, paths, output_root, options, &annotator, &mut cache) {
            Ok(Some(path)) => written.push(path),
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => tracing::warn!(bucket = %label, error = %e, "failed to write poster"),
        }
    }
    Ok(written)
}
