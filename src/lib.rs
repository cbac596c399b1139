//! # Character Palettes
//!
//! Dominant-color palettes for character artwork, and palette similarity
//! within character archetypes.
//!
//! The pipeline:
//! - Loads each character image and resizes it to a fixed working size
//! - Clusters the pixels with k-means into the dominant colors
//! - Records every color in a palette table, the largest cluster marked as
//!   background and the others re-weighted over the remaining pixels
//! - Scores every pair of characters of an archetype with one of three
//!   similarity strategies
//!
//! ## Example
//!
//! ```rust,no_run
//! use character_palettes::{extract_palette, ExtractionConfig};
//! use std::path::Path;
//!
//! let colors = extract_palette(Path::new("knight.png"), &ExtractionConfig::default())?;
//! for color in &colors {
//!     println!("{} {:.1}%", color.hex(), color.percent());
//! }
//! # Ok::<(), character_palettes::PaletteError>(())
//! ```

use std::path::Path;

pub mod color;
pub mod config;
pub mod constants;
pub mod error;
pub mod image_loader;
pub mod pipeline;
pub mod similarity;
pub mod table;

pub use color::{ColorSample, PaletteExtractor};
pub use config::{BatchConfig, ExtractionConfig, OutputConfig, PipelineConfig, ResizeFilter, SimilarityConfig};
pub use error::{PaletteError, Result};
pub use pipeline::{BatchReport, Pipeline};
pub use similarity::{
    ArchetypeSimilarity, CharacterPalette, EmptyPalettePolicy, SimilarityEngine, SimilarityMatrix,
    SimilarityStrategy, WeightMode,
};
pub use table::{BatchFailure, PaletteRow, PaletteTable, PaletteTableBuilder};

/// Extract the dominant colors of one character image
///
/// Colors are ordered by descending pixel share; the first is the
/// background by convention.
///
/// # Errors
///
/// Returns `ImageRead` if the file cannot be decoded, `Clustering` if the
/// image has fewer distinct colors than clusters requested, and
/// `InvalidParameter` if `config` is out of range
pub fn extract_palette(image_path: &Path, config: &ExtractionConfig) -> Result<Vec<ColorSample>> {
    PaletteExtractor::with_config(config.clone())?.extract_path(image_path)
}

/// Run the whole batch described by `config`
pub fn run_pipeline(config: PipelineConfig) -> Result<BatchReport> {
    Pipeline::new(config)?.run()
}
