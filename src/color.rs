//! Floating-point RGBA colors used by every raster layer.
//!
//! Channels are stored as `f32` in the 0..1 range and only quantized to 8 bits
//! when a layer is handed to the PNG encoder.

use std::fmt;

use image::{Rgb, Rgba};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Color::CLEAR
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Uniform gray with full opacity.
    pub const fn gray(v: f32) -> Self {
        Self::rgb(v, v, v)
    }

    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self::rgb(
            rgb[0] as f32 / 255.0,
            rgb[1] as f32 / 255.0,
            rgb[2] as f32 / 255.0,
        )
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation between two colors. `t` is clamped to 0..1, so
    /// callers never extrapolate past either endpoint.
    pub fn lerp(a: Color, b: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
            a: a.a + (b.a - a.a) * t,
        }
    }

    /// Parse a comma separated `"r,g,b"` or `"r,g,b,a"` string of 0..1 floats.
    ///
    /// Returns `None` if fewer than three channels are present or any channel
    /// fails to parse. Channels past the fourth are ignored.
    pub fn parse(s: &str) -> Option<Color> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }

        let r = parts[0].parse::<f32>().ok()?;
        let g = parts[1].parse::<f32>().ok()?;
        let b = parts[2].parse::<f32>().ok()?;
        let a = match parts.get(3) {
            Some(a) => a.parse::<f32>().ok()?,
            None => 1.0,
        };

        Some(Color::rgba(r, g, b, a))
    }

    pub fn to_rgba8(self) -> Rgba<u8> {
        Rgba([
            quantize(self.r),
            quantize(self.g),
            quantize(self.b),
            quantize(self.a),
        ])
    }

    pub fn to_rgb8(self) -> Rgb<u8> {
        Rgb([quantize(self.r), quantize(self.g), quantize(self.b)])
    }
}

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Formats as `RGBA(0.100, 0.200, 0.300, 1.000)`, the notation used in the
/// biome legend sidecar.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RGBA({:.3}, {:.3}, {:.3}, {:.3})",
            self.r, self.g, self.b, self.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb_and_rgba() {
        let c = Color::parse("0.2,0.3,0.4").unwrap();
        assert_eq!(c, Color::rgba(0.2, 0.3, 0.4, 1.0));

        let c = Color::parse("0.1, 0.1, 0.2, 0.5").unwrap();
        assert_eq!(c, Color::rgba(0.1, 0.1, 0.2, 0.5));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Color::parse("").is_none());
        assert!(Color::parse("0.1,0.2").is_none());
        assert!(Color::parse("0.1,x,0.2").is_none());
        assert!(Color::parse("0.1,0.2,0.3,alpha").is_none());
    }

    #[test]
    fn test_lerp_clamps() {
        let mid = Color::lerp(Color::BLACK, Color::WHITE, 0.5);
        assert!((mid.r - 0.5).abs() < 1e-6);
        assert_eq!(Color::lerp(Color::BLACK, Color::WHITE, -1.0), Color::BLACK);
        assert_eq!(Color::lerp(Color::BLACK, Color::WHITE, 2.0), Color::WHITE);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(Color::WHITE.to_rgba8(), Rgba([255, 255, 255, 255]));
        assert_eq!(Color::gray(0.5).to_rgb8(), Rgb([128, 128, 128]));
        assert_eq!(Color::rgb(2.0, -1.0, 0.0).to_rgb8(), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_display() {
        let c = Color::rgba(0.1, 0.2, 0.3, 1.0);
        assert_eq!(c.to_string(), "RGBA(0.100, 0.200, 0.300, 1.000)");
    }
}
