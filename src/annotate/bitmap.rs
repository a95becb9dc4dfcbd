//! Fixed-size bitmap font used when no scalable font can be loaded.
//!
//! Glyphs are 5 columns wide and drawn from 7-row patterns stretched onto an
//! 11-pixel line, so every rendered label is exactly [`NATIVE_FONT_SIZE`] tall.

use image::{Rgba, RgbaImage};

/// Height in pixels of every label rendered by this font.
pub const NATIVE_FONT_SIZE: u32 = 11;

const GLYPH_WIDTH: u32 = 5;
const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Source pattern row for each of the 11 output rows.
const ROW_MAP: [usize; NATIVE_FONT_SIZE as usize] = [0, 1, 1, 2, 2, 3, 4, 4, 5, 5, 6];

fn pattern(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b01110, 0b10000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00001, 0b01110],
        '#' => [0b01010, 0b01010, 0b11111, 0b01010, 0b11111, 0b01010, 0b01010],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ' ' => [0; 7],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

/// Width and height of `text` at the native size.
pub fn measure(text: &str) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    (n * ADVANCE - 1, NATIVE_FONT_SIZE)
}

/// Renders `text` into a transparent buffer sized to its measured box.
///
/// Background pixels carry the text color at zero alpha so that smoothing
/// filters do not darken glyph edges when the buffer is resized.
pub fn render(text: &str, color: Rgba<u8>) -> RgbaImage {
    let (w, h) = measure(text);
    let clear = Rgba([color[0], color[1], color[2], 0]);
    let mut img = RgbaImage::from_pixel(w, h, clear);

    for (i, ch) in text.chars().enumerate() {
        let x0 = i as u32 * ADVANCE;
        let rows = pattern(ch);
        for (y, &src_row) in ROW_MAP.iter().enumerate() {
            let bits = rows[src_row];
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    img.put_pixel(x0 + col, y as u32, color);
                }
            }
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_is_fixed_height() {
        assert_eq!(measure("#1"), (11, NATIVE_FONT_SIZE));
        assert_eq!(measure("#123"), (23, NATIVE_FONT_SIZE));
        assert_eq!(measure(""), (0, 0));
    }

    #[test]
    fn render_draws_opaque_glyph_pixels() {
        let red = Rgba([255, 0, 0, 255]);
        let img = render("#7", red);
        assert_eq!(img.dimensions(), measure("#7"));
        // Top bar of the 7.
        assert_eq!(*img.get_pixel(6, 0), red);
        // Gap column between glyphs stays transparent.
        assert_eq!(img.get_pixel(5, 0)[3], 0);
        // Stretched rows reach the bottom line.
        assert!((0..img.width()).any(|x| img.get_pixel(x, NATIVE_FONT_SIZE - 1)[3] == 255));
    }
}
