//! Color extraction and representation module
//!
//! This module reduces images to dominant-color palettes and provides
//! the hex and unit-range conversions shared by the table and similarity
//! stages.

pub mod conversion;
pub mod extraction;

pub use conversion::{hex_to_rgb, rgb_to_hex};
pub use extraction::{ColorSample, PaletteExtractor};
