//! Label rasterization strategies.
//!
//! Both strategies return the label's pixels in a tight transparent buffer at
//! the requested size; plate geometry and compositing are shared.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rusttype::{Font, Scale, point};

use super::bitmap;

pub trait LabelRenderer {
    fn render(&self, text: &str, font_size: u32, color: Rgba<u8>) -> RgbaImage;
}

/// Draws glyphs straight from a scalable font at the requested pixel size.
pub struct ScalableRenderer<'a> {
    pub font: &'a Font<'static>,
}

impl LabelRenderer for ScalableRenderer<'_> {
    fn render(&self, text: &str, font_size: u32, color: Rgba<u8>) -> RgbaImage {
        let scale = Scale::uniform(font_size as f32);
        let v_metrics = self.font.v_metrics(scale);
        let glyphs: Vec<_> = self
            .font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .collect();

        let Some((min_x, min_y, max_x, max_y)) = glyphs
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .map(|bb| (bb.min.x, bb.min.y, bb.max.x, bb.max.y))
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
        else {
            return RgbaImage::new(0, 0);
        };

        let w = (max_x - min_x) as u32;
        let h = (max_y - min_y) as u32;
        let mut img = RgbaImage::from_pixel(w, h, Rgba([color[0], color[1], color[2], 0]));

        for glyph in &glyphs {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            let ox = (bb.min.x - min_x) as u32;
            let oy = (bb.min.y - min_y) as u32;
            glyph.draw(|x, y, coverage| {
                let (px, py) = (ox + x, oy + y);
                if px >= w || py >= h {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32).round() as u8;
                let pixel = img.get_pixel_mut(px, py);
                pixel[3] = pixel[3].max(alpha);
            });
        }
        img
    }
}

/// Renders with the bitmap font once and resizes the result so the label
/// follows the requested size instead of the font's native one.
pub struct FallbackRenderer;

impl FallbackRenderer {
    pub fn scale_for(font_size: u32) -> f32 {
        font_size as f32 / bitmap::NATIVE_FONT_SIZE as f32
    }
}

impl LabelRenderer for FallbackRenderer {
    fn render(&self, text: &str, font_size: u32, color: Rgba<u8>) -> RgbaImage {
        let native = bitmap::render(text, color);
        if native.width() == 0 {
            return native;
        }
        let scale = Self::scale_for(font_size);
        let w = ((native.width() as f32 * scale).round() as u32).max(1);
        let h = ((native.height() as f32 * scale).round() as u32).max(1);
        imageops::resize(&native, w, h, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn fallback_follows_requested_size() {
        let small = FallbackRenderer.render("#12", 20, WHITE);
        let large = FallbackRenderer.render("#12", 80, WHITE);
        assert_eq!(small.height(), 20);
        assert_eq!(large.height(), 80);
        assert!(large.width() >= small.width() * 3);
    }

    #[test]
    fn fallback_at_native_size_is_unscaled() {
        let img = FallbackRenderer.render("#3", bitmap::NATIVE_FONT_SIZE, WHITE);
        assert_eq!(img.dimensions(), bitmap::measure("#3"));
    }
}
