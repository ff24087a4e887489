//! RGBA colors and the packed 24-bit encoding used by renderer materials.

use serde::{Deserialize, Serialize};

/// A color with each channel normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Pack R, G and B into `0xRRGGBB`.  Alpha does not take part; read it
    /// separately through [`Rgba::opacity`].
    pub fn pack_rgb(&self) -> u32 {
        pack_rgb([self.r, self.g, self.b])
    }

    /// Alpha clamped to `[0, 1]`.
    pub fn opacity(&self) -> f64 {
        clamp_unit(self.a)
    }

    pub fn is_translucent(&self) -> bool {
        self.opacity() < 1.0
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::opaque(0.9, 0.9, 0.9)
    }
}

impl From<[f64; 4]> for Rgba {
    fn from(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// `Σ 256^(2-i) · round(255 · channel_i)` over R, G, B.
///
/// Channels outside `[0, 1]` are clamped and NaN counts as zero, so the
/// result always lies in `[0, 0xFFFFFF]`.
pub fn pack_rgb(rgb: [f64; 3]) -> u32 {
    rgb.iter()
        .fold(0u32, |acc, &c| (acc << 8) | (255.0 * clamp_unit(c)).round() as u32)
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
