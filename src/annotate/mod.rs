//! Overlays a `#<index>` label on an image corner.
//!
//! A label is rasterized by one of two strategies (scalable font, or the
//! bitmap font resized to the requested size), positioned together with its
//! background plate, and alpha-composited onto a copy of the input.

pub mod bitmap;
pub mod font;
pub mod render;

use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, GrayAlphaImage, GrayImage, Rgba, RgbImage, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::error::{OrganizerError, Result};
use font::{FontChoice, FontResolver};
use render::{FallbackRenderer, LabelRenderer, ScalableRenderer};

pub const DEFAULT_PADDING: u32 = 10;

/// Largest accepted label size in pixels. Bigger labels would only be
/// clipped by any realistic image.
pub const MAX_FONT_SIZE: i32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    /// Top-left corner of a `bw`x`bh` plate inside a `w`x`h` image, `margin`
    /// pixels away from the nearest edges.
    pub fn anchor(self, w: u32, h: u32, bw: u32, bh: u32, margin: u32) -> (i64, i64) {
        let (w, h, bw, bh, m) = (w as i64, h as i64, bw as i64, bh as i64, margin as i64);
        match self {
            Position::TopLeft => (m, m),
            Position::TopRight => (w - bw - m, m),
            Position::BottomLeft => (m, h - bh - m),
            Position::BottomRight => (w - bw - m, h - bh - m),
        }
    }
}

impl FromStr for Position {
    type Err = OrganizerError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "topleft" => Ok(Position::TopLeft),
            "topright" => Ok(Position::TopRight),
            "bottomleft" => Ok(Position::BottomLeft),
            "bottomright" => Ok(Position::BottomRight),
            _ => Err(OrganizerError::InvalidPosition(s.to_string())),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::TopLeft => "top_left",
            Position::TopRight => "top_right",
            Position::BottomLeft => "bottom_left",
            Position::BottomRight => "bottom_right",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationRequest {
    pub index: usize,
    pub font_size: i32,
    pub position: Position,
    pub text_color: Rgba<u8>,
    pub background_color: Rgba<u8>,
}

impl AnnotationRequest {
    pub fn new(index: usize, font_size: i32, position: Position) -> Self {
        Self {
            index,
            font_size,
            position,
            text_color: Rgba([255, 255, 255, 255]),
            background_color: Rgba([0, 0, 0, 160]),
        }
    }

    pub fn label(&self) -> String {
        format!("#{}", self.index)
    }
}

/// Label pixels placed on an image together with their background plate.
#[derive(Debug, Clone)]
pub struct PositionedLabel {
    pub label: RgbaImage,
    pub plate_origin: (i64, i64),
    pub plate_size: (u32, u32),
    pub padding: u32,
}

impl PositionedLabel {
    pub fn place(label: RgbaImage, image_size: (u32, u32), position: Position, padding: u32) -> Self {
        let plate_size = (label.width() + 2 * padding, label.height() + 2 * padding);
        let plate_origin = position.anchor(
            image_size.0,
            image_size.1,
            plate_size.0,
            plate_size.1,
            padding,
        );
        Self {
            label,
            plate_origin,
            plate_size,
            padding,
        }
    }

    pub fn label_origin(&self) -> (i64, i64) {
        (
            self.plate_origin.0 + self.padding as i64,
            self.plate_origin.1 + self.padding as i64,
        )
    }

    /// Composites plate and label over a copy of `base`.
    pub fn composite(&self, base: &RgbaImage, background: Rgba<u8>) -> RgbaImage {
        let mut overlay = RgbaImage::new(base.width(), base.height());
        let (bw, bh) = self.plate_size;
        if bw > 0 && bh > 0 {
            let (x, y) = self.plate_origin;
            draw_filled_rect_mut(
                &mut overlay,
                Rect::at(clamp_i32(x), clamp_i32(y)).of_size(bw, bh),
                background,
            );
        }
        let (lx, ly) = self.label_origin();
        image::imageops::overlay(&mut overlay, &self.label, lx, ly);

        let mut out = base.clone();
        image::imageops::overlay(&mut out, &overlay, 0, 0);
        out
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Annotates images, resolving its font on first use.
#[derive(Debug)]
pub struct Annotator {
    resolver: FontResolver,
    padding: u32,
    font: OnceCell<FontChoice>,
}

impl Annotator {
    pub fn new(resolver: FontResolver) -> Self {
        Self {
            resolver,
            padding: DEFAULT_PADDING,
            font: OnceCell::new(),
        }
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    pub fn font_choice(&self) -> &FontChoice {
        self.font.get_or_init(|| self.resolver.resolve())
    }

    /// Rasterizes the label for `request` without placing it.
    pub fn render_label(&self, request: &AnnotationRequest) -> Result<RgbaImage> {
        let size = validate_font_size(request.font_size)?;
        let text = request.label();
        Ok(match self.font_choice() {
            FontChoice::Scalable { font, .. } => {
                ScalableRenderer { font }.render(&text, size, request.text_color)
            }
            FontChoice::Fallback => FallbackRenderer.render(&text, size, request.text_color),
        })
    }

    /// Returns a copy of `image` with the index label drawn at the requested
    /// corner. The input is left untouched; the output keeps its size and
    /// color type.
    pub fn annotate(&self, image: &DynamicImage, request: &AnnotationRequest) -> Result<DynamicImage> {
        let (w, h) = (image.width(), image.height());
        if w == 0 || h == 0 {
            return Err(OrganizerError::UnsupportedImage(format!(
                "image has no pixels ({w}x{h})"
            )));
        }

        let label = self.render_label(request)?;
        let placed = PositionedLabel::place(label, (w, h), request.position, self.padding);
        let out = placed.composite(&image.to_rgba8(), request.background_color);
        Ok(match_color_type(image, out))
    }
}

pub(crate) fn validate_font_size(font_size: i32) -> Result<u32> {
    if !(1..=MAX_FONT_SIZE).contains(&font_size) {
        return Err(OrganizerError::InvalidFontSize(font_size));
    }
    Ok(font_size as u32)
}

/// Converts the composited RGBA result back to `original`'s color type.
fn match_color_type(original: &DynamicImage, rgba: RgbaImage) -> DynamicImage {
    let out = DynamicImage::ImageRgba8(rgba);
    match original {
        DynamicImage::ImageLuma8(_) => DynamicImage::ImageLuma8(out.to_luma8()),
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageLumaA8(out.to_luma_alpha8()),
        DynamicImage::ImageRgb8(_) => DynamicImage::ImageRgb8(out.to_rgb8()),
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma16(out.to_luma16()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA16(out.to_luma_alpha16()),
        DynamicImage::ImageRgb16(_) => DynamicImage::ImageRgb16(out.to_rgb16()),
        DynamicImage::ImageRgba16(_) => DynamicImage::ImageRgba16(out.to_rgba16()),
        DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb32F(out.to_rgb32f()),
        DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba32F(out.to_rgba32f()),
        _ => out,
    }
}

/// Builds an image from a raw interleaved 8-bit pixel buffer with 1, 2, 3 or
/// 4 channels.
pub fn raster_from_raw(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(OrganizerError::UnsupportedImage(format!(
            "raster has no pixels ({width}x{height})"
        )));
    }
    let expected = width as usize * height as usize * channels as usize;
    if pixels.len() != expected {
        return Err(OrganizerError::UnsupportedImage(format!(
            "{width}x{height}x{channels} raster needs {expected} bytes, got {}",
            pixels.len()
        )));
    }
    let mismatch = || OrganizerError::UnsupportedImage("raster buffer size mismatch".to_string());
    match channels {
        1 => GrayImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(mismatch),
        2 => GrayAlphaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageLumaA8)
            .ok_or_else(mismatch),
        3 => RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(mismatch),
        4 => RgbaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(mismatch),
        n => Err(OrganizerError::UnsupportedImage(format!(
            "{n}-channel rasters are not supported"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_follow_corners() {
        assert_eq!(Position::TopLeft.anchor(100, 80, 30, 20, 10), (10, 10));
        assert_eq!(Position::TopRight.anchor(100, 80, 30, 20, 10), (60, 10));
        assert_eq!(Position::BottomLeft.anchor(100, 80, 30, 20, 10), (10, 50));
        assert_eq!(Position::BottomRight.anchor(100, 80, 30, 20, 10), (60, 50));
    }

    #[test]
    fn parses_position_spellings() {
        assert_eq!("top_left".parse::<Position>().unwrap(), Position::TopLeft);
        assert_eq!("Bottom-Right".parse::<Position>().unwrap(), Position::BottomRight);
        assert_eq!("topright".parse::<Position>().unwrap(), Position::TopRight);
        assert!(matches!(
            "center".parse::<Position>(),
            Err(OrganizerError::InvalidPosition(p)) if p == "center"
        ));
    }

    #[test]
    fn plate_wraps_label_with_padding() {
        let placed = PositionedLabel::place(RgbaImage::new(40, 22), (200, 100), Position::BottomRight, 10);
        assert_eq!(placed.plate_size, (60, 42));
        assert_eq!(placed.plate_origin, (130, 48));
        assert_eq!(placed.label_origin(), (140, 58));
    }

    #[test]
    fn raw_buffers_are_checked() {
        assert!(raster_from_raw(2, 2, 3, vec![0; 12]).is_ok());
        for (w, h, c, len) in [(0, 2, 3, 0), (2, 2, 3, 11), (2, 2, 5, 20)] {
            assert!(matches!(
                raster_from_raw(w, h, c, vec![0; len]),
                Err(OrganizerError::UnsupportedImage(_))
            ));
        }
    }
}
