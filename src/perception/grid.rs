//! Uniform numbered grid over a screenshot.
//!
//! When the oracle cannot address a discrete UI element it falls back to
//! grid addressing: the screenshot is partitioned into uniform cells,
//! numbered row-major from 1, and each cell's number is printed on the image
//! so the model can read the label it replies with. The partition is a pure
//! function of the image dimensions, so a cell label in a reply can be
//! resolved later without any persisted grid state.

use std::path::Path;

use crate::actions::SubArea;
use crate::errors::{ScoutError, ScoutResult};

/// Preferred cell edge length range, in pixels.
const UNIT_RANGE: std::ops::RangeInclusive<u32> = 120..=180;
const UNIT_FALLBACK: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub unit_width: u32,
    pub unit_height: u32,
    pub rows: u32,
    pub cols: u32,
}

impl GridSpec {
    /// Partition an image. Each axis independently gets the smallest
    /// divisor of its dimension inside the preferred range, falling back to
    /// 120 when no divisor lands there (leaving a remainder strip outside
    /// the grid).
    pub fn compute(width: u32, height: u32) -> Self {
        let unit_width = unit_len(width);
        let unit_height = unit_len(height);
        Self {
            unit_width,
            unit_height,
            rows: height / unit_height,
            cols: width / unit_width,
        }
    }

    pub fn cell_count(&self) -> u32 {
        self.rows * self.cols
    }

    /// Top-left pixel of a 1-based, row-major cell number.
    pub fn cell_origin(&self, area: u32) -> Option<(u32, u32)> {
        if area == 0 || area > self.cell_count() {
            return None;
        }
        let idx = area - 1;
        Some((
            (idx % self.cols) * self.unit_width,
            (idx / self.cols) * self.unit_height,
        ))
    }

    /// Pixel coordinate of a named sub-position inside a cell.
    pub fn resolve(&self, area: u32, subarea: SubArea) -> Option<(i32, i32)> {
        let (ox, oy) = self.cell_origin(area)?;
        let (fx, fy) = subarea.offsets();
        Some((
            (ox as f64 + fx * self.unit_width as f64).floor() as i32,
            (oy as f64 + fy * self.unit_height as f64).floor() as i32,
        ))
    }
}

fn unit_len(n: u32) -> u32 {
    (1..=n)
        .find(|i| n % i == 0 && UNIT_RANGE.contains(i))
        .unwrap_or(UNIT_FALLBACK)
}

// ── Overlay rendering ────────────────────────────────────────────────────────

// 5×5 bitmap digits; each row is a u8 with bit 4 as the leftmost pixel.
const DIGITS_5X5: [[u8; 5]; 10] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // 0
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110], // 1
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111], // 2
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110], // 3
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010], // 4
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110], // 5
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110], // 6
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100], // 7
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110], // 8
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110], // 9
];

const LINE_RGBA: (u8, u8, u8, u8) = (0, 200, 255, 130);
const LABEL_RGB: (u8, u8, u8) = (255, 220, 0);
const LABEL_PAD: u32 = 4;

/// Render `spec` onto the screenshot at `src` and write the labeled copy to
/// `dest` as PNG. Every cell gets its number printed at its top-left corner
/// so the oracle reads labels straight off the image.
pub fn draw_grid_overlay(src: &Path, dest: &Path, spec: &GridSpec) -> ScoutResult<()> {
    let img = image::open(src)
        .map_err(|e| ScoutError::Perception(format!("load {}: {e}", src.display())))?;
    let mut canvas = img.to_rgba8();
    let (w, h) = canvas.dimensions();

    let extent_x = (spec.cols * spec.unit_width).min(w);
    let extent_y = (spec.rows * spec.unit_height).min(h);

    for col in 0..=spec.cols {
        let x = col * spec.unit_width;
        for y in 0..extent_y {
            for dx in 0..2 {
                if x + dx < w {
                    blend_pixel(canvas.get_pixel_mut(x + dx, y), LINE_RGBA);
                }
            }
        }
    }
    for row in 0..=spec.rows {
        let y = row * spec.unit_height;
        for x in 0..extent_x {
            for dy in 0..2 {
                if y + dy < h {
                    blend_pixel(canvas.get_pixel_mut(x, y + dy), LINE_RGBA);
                }
            }
        }
    }

    let scale: u32 = if spec.unit_width >= 80 { 2 } else { 1 };
    for area in 1..=spec.cell_count() {
        if let Some((ox, oy)) = spec.cell_origin(area) {
            draw_label(&mut canvas, area, ox + LABEL_PAD, oy + LABEL_PAD, scale);
        }
    }

    image::DynamicImage::ImageRgba8(canvas)
        .save_with_format(dest, image::ImageFormat::Png)
        .map_err(|e| ScoutError::Perception(format!("write {}: {e}", dest.display())))?;
    Ok(())
}

/// Draw a cell number at (px, py): a darkened backing box, then the digits.
fn draw_label(canvas: &mut image::RgbaImage, number: u32, px: u32, py: u32, scale: u32) {
    let digits: Vec<u32> = number
        .to_string()
        .bytes()
        .map(|b| (b - b'0') as u32)
        .collect();
    let (w, h) = canvas.dimensions();
    let char_step = 5 * scale + scale; // one glyph column of spacing
    let label_w = digits.len() as u32 * char_step;
    let label_h = 5 * scale;

    let bg_x = px.saturating_sub(1);
    let bg_y = py.saturating_sub(1);
    for y in bg_y..(bg_y + label_h + 2).min(h) {
        for x in bg_x..(bg_x + label_w + 2).min(w) {
            let p = canvas.get_pixel_mut(x, y);
            p[0] = (p[0] as f32 * 0.25) as u8;
            p[1] = (p[1] as f32 * 0.25) as u8;
            p[2] = (p[2] as f32 * 0.25) as u8;
            p[3] = 255;
        }
    }

    for (i, &digit) in digits.iter().enumerate() {
        let glyph = &DIGITS_5X5[digit as usize];
        let gx = px + i as u32 * char_step;
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..5u32 {
                if (bits >> (4 - col)) & 1 == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let x = gx + col * scale + sx;
                        let y = py + row as u32 * scale + sy;
                        if x < w && y < h {
                            let p = canvas.get_pixel_mut(x, y);
                            p[0] = LABEL_RGB.0;
                            p[1] = LABEL_RGB.1;
                            p[2] = LABEL_RGB.2;
                            p[3] = 255;
                        }
                    }
                }
            }
        }
    }
}

fn blend_pixel(pixel: &mut image::Rgba<u8>, (r, g, b, a): (u8, u8, u8, u8)) {
    let alpha = a as f32 / 255.0;
    pixel[0] = (pixel[0] as f32 * (1.0 - alpha) + r as f32 * alpha).round() as u8;
    pixel[1] = (pixel[1] as f32 * (1.0 - alpha) + g as f32 * alpha).round() as u8;
    pixel[2] = (pixel[2] as f32 * (1.0 - alpha) + b as f32 * alpha).round() as u8;
}
