//! Contact-sheet posters of a bucket's images.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba};

use crate::annotate::{AnnotationRequest, Annotator, Position};
use crate::error::{OrganizerError, Result};

const CELL_GAP: u32 = 4;
const POSTER_BACKGROUND: Rgb<u8> = Rgb([24, 24, 24]);

#[derive(Debug, Clone, PartialEq)]
pub struct PosterOptions {
    pub columns: u32,
    pub cell_size: u32,
    pub max_images: usize,
    pub annotate_with_index: bool,
    pub font_size: i32,
    pub position: Position,
    pub text_color: Rgba<u8>,
    pub background_color: Rgba<u8>,
}

impl Default for PosterOptions {
    fn default() -> Self {
        Self {
            columns: 0,
            cell_size: 256,
            max_images: 100,
            annotate_with_index: true,
            font_size: 24,
            position: Position::TopLeft,
            text_color: Rgba([255, 255, 255, 255]),
            background_color: Rgba([0, 0, 0, 153]),
        }
    }
}

/// Decodes an image file; anything undecodable is an unsupported image.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path)
        .map_err(|e| OrganizerError::UnsupportedImage(format!("{}: {e}", path.display())))
}

/// Decoded images keyed by path. Disabled caches decode on every call.
#[derive(Debug, Default)]
pub struct ImageCache {
    enabled: bool,
    images: HashMap<PathBuf, DynamicImage>,
}

impl ImageCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            images: HashMap::new(),
        }
    }

    pub fn get(&mut self, path: &Path) -> Result<DynamicImage> {
        if !self.enabled {
            return load_image(path);
        }
        if let Some(img) = self.images.get(path) {
            return Ok(img.clone());
        }
        let img = load_image(path)?;
        self.images.insert(path.to_path_buf(), img.clone());
        Ok(img)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Columns and rows for `count` cells. `columns == 0` picks the smallest
/// square-ish grid.
pub fn grid_dims(count: usize, columns: u32) -> (u32, u32) {
    if count == 0 {
        return (0, 0);
    }
    let count = count as u32;
    let cols = if columns == 0 {
        (count as f64).sqrt().ceil() as u32
    } else {
        columns.min(count)
    };
    (cols, count.div_ceil(cols))
}

/// Composes `paths` into a grid, labelling each cell with its 1-based index.
///
/// Images that cannot be decoded leave their cell empty. Returns `None` when
/// there is nothing to draw.
pub fn render_bucket_poster(
    paths: &[PathBuf],
    options: &PosterOptions,
    annotator: &Annotator,
    cache: &mut ImageCache,
) -> Result<Option<RgbImage>> {
    let paths = &paths[..paths.len().min(options.max_images)];
    let (cols, rows) = grid_dims(paths.len(), options.columns);
    if cols == 0 {
        return Ok(None);
    }

    let cell = options.cell_size;
    let width = cols * cell + (cols + 1) * CELL_GAP;
    let height = rows * cell + (rows + 1) * CELL_GAP;
    let mut canvas = RgbImage::from_pixel(width, height, POSTER_BACKGROUND);

    for (i, path) in paths.iter().enumerate() {
        let img = match cache.get(path) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping image in poster");
                continue;
            }
        };
        let mut thumb = img.resize(cell, cell, FilterType::Triangle);
        if options.annotate_with_index {
            let request = AnnotationRequest {
                text_color: options.text_color,
                background_color: options.background_color,
                ..AnnotationRequest::new(i + 1, options.font_size, options.position)
            };
            thumb = annotator.annotate(&thumb, &request)?;
        }

        let (col, row) = (i as u32 % cols, i as u32 / cols);
        let x = CELL_GAP + col * (cell + CELL_GAP) + (cell - thumb.width()) / 2;
        let y = CELL_GAP + row * (cell + CELL_GAP) + (cell - thumb.height()) / 2;
        imageops::replace(&mut canvas, &thumb.to_rgb8(), x as i64, y as i64);
    }

    Ok(Some(canvas))
}

/// Renders the poster for one bucket to `<output_root>/<label>_poster.png`.
/// `<output_root>/<label>_poster.png`
pub fn poster_path(output_root: &Path, label: &str) -> PathBuf {
    output_root.join(format!("{label}_poster.png"))
}

pub fn write_bucket_poster(
    label: &str,
    paths: &[PathBuf],
    output_root: &Path,
    options: &PosterOptions,
    annotator: &Annotator,
    cache: &mut ImageCache,
) -> Result<Option<PathBuf>> {
    let Some(poster) = render_bucket_poster(paths, options, annotator, cache)? else {
        return Ok(None);
    };
    std::fs::create_dir_all(output_root)?;
    let out = poster_path(output_root, label);
    poster.save(&out)?;
    tracing::info!(bucket = label, path = %out.display(), images = paths.len().min(options.max_images), "wrote poster");
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_dims_auto_and_fixed() {
        assert_eq!(grid_dims(0, 0), (0, 0));
        assert_eq!(grid_dims(1, 0), (1, 1));
        assert_eq!(grid_dims(5, 0), (3, 2));
        assert_eq!(grid_dims(9, 0), (3, 3));
        assert_eq!(grid_dims(10, 4), (4, 3));
        assert_eq!(grid_dims(2, 8), (2, 1));
    }

    #[test]
    fn cache_reuses_decoded_images() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.png");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&path).expect("save");

        let mut cache = ImageCache::new(true);
        cache.get(&path).expect("load");
        std::fs::remove_file(&path).expect("remove");
        assert!(cache.get(&path).is_ok());
        assert_eq!(cache.len(), 1);

        let mut uncached = ImageCache::new(false);
        assert!(matches!(uncached.get(&path), Err(OrganizerError::UnsupportedImage(_))));
    }
}
