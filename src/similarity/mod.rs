//! Palette similarity module
//!
//! Scores pairs of character palettes with a selectable strategy and
//! assembles per-archetype similarity matrices.

pub mod matrix;
pub mod strategy;

pub use matrix::{ArchetypeSimilarity, EmptyPalettePolicy, SimilarityEngine, SimilarityMatrix};
pub use strategy::{CharacterPalette, PaletteEntry, SimilarityStrategy, WeightMode};
