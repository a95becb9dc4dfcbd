//! Image manifests and the sources of anomaly scores.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{OrganizerError, Result};

/// One scored image as produced by the predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub image_path: PathBuf,
    #[serde(alias = "pred_score", alias = "score")]
    pub anomaly_score: f64,
}

impl PredictionResult {
    pub fn new(image_path: impl Into<PathBuf>, anomaly_score: f64) -> Self {
        Self {
            image_path: image_path.into(),
            anomaly_score,
        }
    }
}

/// Reads a manifest with one image path per line.
///
/// Blank lines and `#` comments are skipped; relative entries resolve against
/// the manifest's own directory.
pub fn load_image_list(manifest: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(manifest)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| resolve_against(manifest, PathBuf::from(l)))
        .collect())
}

/// Joins a relative `path` onto the directory holding `listing`.
fn resolve_against(listing: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        listing.parent().unwrap_or(Path::new("")).join(path)
    } else {
        path
    }
}

fn resolve_records(listing: &Path, records: &mut [PredictionResult]) {
    for r in records {
        r.image_path = resolve_against(listing, std::mem::take(&mut r.image_path));
    }
}

/// Loads prediction records in file order: a JSON array of records, or
/// `path,score` CSV when the extension is `.csv`. Relative image paths
/// resolve against the score file's directory, as manifest entries do.
pub fn load_predictions(path: &Path) -> Result<Vec<PredictionResult>> {
    let text = fs::read_to_string(path)?;
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let mut records: Vec<PredictionResult> = if is_csv {
        parse_csv(&text)?
    } else {
        serde_json::from_str(&text)?
    };
    resolve_records(path, &mut records);
    Ok(records)
}

/// Anything that can score a list of images.
pub trait Predictor {
    /// Returns scores for the images it could handle. Images without a
    /// result are reported by the caller.
    fn predict(&mut self, manifest: &Path, images: &[PathBuf]) -> Result<Vec<PredictionResult>>;
}

/// Precomputed scores keyed by image path.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    scores: HashMap<PathBuf, f64>,
}

impl ScoreTable {
    pub fn from_results(results: impl IntoIterator<Item = PredictionResult>) -> Self {
        Self {
            scores: results
                .into_iter()
                .map(|r| (r.image_path, r.anomaly_score))
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_results(load_predictions(path)?))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, image: &Path) -> Option<f64> {
        self.scores.get(image).copied()
    }
}

impl Predictor for ScoreTable {
    fn predict(&mut self, _manifest: &Path, images: &[PathBuf]) -> Result<Vec<PredictionResult>> {
        Ok(images
            .iter()
            .filter_map(|p| self.get(p).map(|s| PredictionResult::new(p.clone(), s)))
            .collect())
    }
}

fn parse_csv(text: &str) -> Result<Vec<PredictionResult>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((path, score)) = line.rsplit_once(',') else {
            return Err(OrganizerError::Configuration(format!(
                "score csv line {}: expected `path,score`",
                lineno + 1
            )));
        };
        match score.trim().parse::<f64>() {
            Ok(score) => out.push(PredictionResult::new(path.trim(), score)),
            // header row
            Err(_) if lineno == 0 => continue,
            Err(e) => {
                return Err(OrganizerError::Configuration(format!(
                    "score csv line {}: {e}",
                    lineno + 1
                )));
            }
        }
    }
    Ok(out)
}

/// Runs an external scoring program with the manifest path as its last
/// argument and parses a JSON array of records from its stdout. Relative
/// paths in the output resolve against the manifest's directory.
#[derive(Debug, Clone)]
pub struct CommandPredictor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandPredictor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Predictor for CommandPredictor {
    fn predict(&mut self, manifest: &Path, _images: &[PathBuf]) -> Result<Vec<PredictionResult>> {
        tracing::info!(program = %self.program.display(), "running external predictor");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(manifest)
            .output()?;
        if !output.status.success() {
            return Err(OrganizerError::Predictor(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let mut records: Vec<PredictionResult> = serde_json::from_slice(&output.stdout)?;
        resolve_records(manifest, &mut records);
        tracing::debug!(records = records.len(), "predictor finished");
        Ok(records)
    }
}
