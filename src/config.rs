//! Run configuration loaded from TOML and validated before any image is touched.

use std::fs;
use std::path::{Path, PathBuf};

use image::Rgba;
use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::annotate::font::FontResolver;
use crate::annotate::{Annotator, Position, validate_font_size};
use crate::classify::BucketScheme;
use crate::error::{OrganizerError, Result};
use crate::poster::PosterOptions;
use crate::relocate::RelocationMode;
use crate::thresholds::ScoreDomain;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrganizerConfig {
    pub thresholds: Vec<f64>,
    /// Empty means labels are generated from the thresholds.
    pub bucket_labels: Vec<String>,
    pub score_domain: ScoreDomain,
    pub relocation_mode: RelocationMode,
    pub save_metadata: bool,
    pub render_posters: bool,
    pub annotate_with_index: bool,
    pub font_size: i32,
    pub annotation_position: String,
    pub cache_loaded_images: bool,
    /// Font files tried in order; empty means the platform defaults.
    pub font_candidates: Vec<PathBuf>,
    pub text_color: String,
    pub background_color: String,
    pub background_opacity: f32,
    pub padding: u32,
    pub poster: PosterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PosterConfig {
    /// 0 picks a near-square grid.
    pub columns: u32,
    pub cell_size: u32,
    pub max_images: usize,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            columns: 0,
            cell_size: 256,
            max_images: 100,
        }
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![0.5],
            bucket_labels: Vec::new(),
            score_domain: ScoreDomain::UNIT,
            relocation_mode: RelocationMode::Copy,
            save_metadata: true,
            render_posters: false,
            annotate_with_index: true,
            font_size: 24,
            annotation_position: Position::TopLeft.to_string(),
            cache_loaded_images: false,
            font_candidates: Vec::new(),
            text_color: "#ffffff".to_string(),
            background_color: "#000000".to_string(),
            background_opacity: 0.6,
            padding: crate::annotate::DEFAULT_PADDING,
            poster: PosterConfig::default(),
        }
    }
}

impl OrganizerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            OrganizerError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks everything that would make the whole run invalid and returns
    /// the bucket scheme.
    pub fn validate(&self) -> Result<BucketScheme> {
        let scheme = BucketScheme::new(&self.thresholds, &self.bucket_labels, self.score_domain)?;
        if self.render_posters {
            self.poster_options()?;
        }
        Ok(scheme)
    }

    pub fn position(&self) -> Result<Position> {
        self.annotation_position.parse()
    }

    pub fn text_rgba(&self) -> Result<Rgba<u8>> {
        parse_hex_color(&self.text_color, 1.0)
    }

    pub fn background_rgba(&self) -> Result<Rgba<u8>> {
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(OrganizerError::Configuration(format!(
                "background_opacity {} must lie in [0, 1]",
                self.background_opacity
            )));
        }
        parse_hex_color(&self.background_color, self.background_opacity)
    }

    pub fn poster_options(&self) -> Result<PosterOptions> {
        validate_font_size(self.font_size)?;
        if self.poster.cell_size == 0 {
            return Err(OrganizerError::Configuration(
                "poster.cell_size must be greater than zero".to_string(),
            ));
        }
        Ok(PosterOptions {
            columns: self.poster.columns,
            cell_size: self.poster.cell_size,
            max_images: self.poster.max_images,
            annotate_with_index: self.annotate_with_index,
            font_size: self.font_size,
            position: self.position()?,
            text_color: self.text_rgba()?,
            background_color: self.background_rgba()?,
        })
    }

    pub fn font_resolver(&self) -> FontResolver {
        if self.font_candidates.is_empty() {
            FontResolver::system_default()
        } else {
            FontResolver::new(self.font_candidates.clone())
        }
    }

    pub fn annotator(&self) -> Annotator {
        Annotator::new(self.font_resolver()).with_padding(self.padding)
    }
}

/// Parses `#rrggbb` / `#rgb` into an RGBA pixel with the given opacity.
pub fn parse_hex_color(hex: &str, opacity: f32) -> Result<Rgba<u8>> {
    let rgb: Srgb<u8> = hex
        .trim()
        .parse()
        .map_err(|e| OrganizerError::Configuration(format!("invalid color {hex:?}: {e}")))?;
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Ok(Rgba([rgb.red, rgb.green, rgb.blue, alpha]))
}
