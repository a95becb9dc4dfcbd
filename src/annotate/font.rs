//! Locates a scalable font for annotation labels.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use rusttype::Font;

/// Outcome of font resolution.
pub enum FontChoice {
    Scalable { font: Font<'static>, source: PathBuf },
    Fallback,
}

impl FontChoice {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FontChoice::Fallback)
    }
}

impl fmt::Debug for FontChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontChoice::Scalable { source, .. } => {
                f.debug_struct("Scalable").field("source", source).finish()
            }
            FontChoice::Fallback => f.write_str("Fallback"),
        }
    }
}

/// Ordered list of font files to try; the first one that loads wins.
#[derive(Debug, Clone, Default)]
pub struct FontResolver {
    candidates: Vec<PathBuf>,
}

impl FontResolver {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Resolver over the well-known font locations of the host platform.
    pub fn system_default() -> Self {
        Self::new(default_font_candidates())
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn resolve(&self) -> FontChoice {
        for path in &self.candidates {
            let bytes = match fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::trace!(path = %path.display(), error = %e, "font candidate unavailable");
                    continue;
                }
            };
            match Font::try_from_vec(bytes) {
                Some(font) => {
                    tracing::debug!(path = %path.display(), "using scalable font");
                    return FontChoice::Scalable {
                        font,
                        source: path.clone(),
                    };
                }
                None => {
                    tracing::debug!(path = %path.display(), "font candidate is not a readable font");
                }
            }
        }

        tracing::warn!(
            candidates = self.candidates.len(),
            "no scalable font found; labels will use the scaled bitmap font"
        );
        FontChoice::Fallback
    }
}

/// Platform font locations, most preferred first.
pub fn default_font_candidates() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "linux") {
        &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
            "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
            "/usr/share/fonts/truetype/ubuntu/Ubuntu-B.ttf",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
            "/Library/Fonts/Arial Bold.ttf",
            "/System/Library/Fonts/Helvetica.ttc",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\Windows\\Fonts\\arialbd.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
            "C:\\Windows\\Fonts\\segoeui.ttf",
        ]
    } else {
        &[]
    };
    paths.iter().map(PathBuf::from).collect()
}
