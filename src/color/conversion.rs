//! Color representation helpers
//!
//! Conversions between 8-bit sRGB triples, hex strings and the unit-range
//! float vectors used by the similarity metrics.

use palette::Srgb;

use crate::{PaletteError, Result};

/// Format an 8-bit color as `#rrggbb` (lowercase, zero-padded)
pub fn rgb_to_hex(rgb: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
}

/// Parse a hex color string to an 8-bit color
///
/// Accepts `#rrggbb` or `rrggbb` in either case.
///
/// # Errors
///
/// Returns `InvalidParameter` if the string is not six hex digits
pub fn hex_to_rgb(hex: &str) -> Result<Srgb<u8>> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(PaletteError::invalid_parameter("hex color", hex));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| PaletteError::invalid_parameter("hex color", hex))
    };

    Ok(Srgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Scale an 8-bit color to `[0, 1]` channels
pub fn to_unit_rgb(rgb: Srgb<u8>) -> [f64; 3] {
    [
        f64::from(rgb.red) / 255.0,
        f64::from(rgb.green) / 255.0,
        f64::from(rgb.blue) / 255.0,
    ]
}

/// Round a unit-range float color to the nearest 8-bit color
pub fn from_unit_rgb(rgb: Srgb<f32>) -> Srgb<u8> {
    let quantize = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Srgb::new(quantize(rgb.red), quantize(rgb.green), quantize(rgb.blue))
}

/// Euclidean distance between two unit-range colors
pub fn euclidean_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
