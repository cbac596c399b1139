//! Palette-to-palette similarity metrics
//!
//! Three interchangeable strategies score two palettes in [0, 1]:
//!
//! - [`SimilarityStrategy::WeightedCentroid`]: cosine of the weighted color sums
//! - [`SimilarityStrategy::PerceptualNearestNeighbor`]: `1 / (1 + d)` where `d`
//!   is the symmetric mean nearest-color distance
//! - [`SimilarityStrategy::FlattenedCosine`]: cosine of the weighted colors
//!   concatenated in palette order
//!
//! Colors are stored as RGB with channels scaled to [0, 1]. The cosine
//! strategies are scale-free; nearest-color distances are taken in 8-bit
//! channel units so that opposite colors score near 0.

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::color::conversion::{euclidean_distance, to_unit_rgb};
use crate::table::{CharacterRows, PaletteRow};
use crate::{PaletteError, Result};

const CHANNEL_MAX: f64 = 255.0;

/// Selectable similarity metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityStrategy {
    WeightedCentroid,
    PerceptualNearestNeighbor,
    FlattenedCosine,
}

/// How palette rows are weighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightMode {
    /// Weight by the background-adjusted percent (missing counts as 0)
    Adjusted,
    /// Every color weighs 1.0
    Unweighted,
}

/// One weighted color of a palette
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteEntry {
    /// RGB channels in [0, 1]
    pub rgb: [f64; 3],
    pub weight: f64,
}

impl PaletteEntry {
    pub fn new(rgb: Srgb<u8>, weight: f64) -> Self {
        Self {
            rgb: to_unit_rgb(rgb),
            weight,
        }
    }

    pub fn from_unit(rgb: [f64; 3], weight: f64) -> Self {
        Self { rgb, weight }
    }
}

/// A character's palette with the background row already removed
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterPalette {
    pub character_id: String,
    pub entries: Vec<PaletteEntry>,
}

impl CharacterPalette {
    pub fn new(character_id: impl Into<String>, entries: Vec<PaletteEntry>) -> Self {
        Self {
            character_id: character_id.into(),
            entries,
        }
    }

    /// Build from a character's table rows, dropping the background row
    pub fn from_rows(character: &CharacterRows<'_>, mode: WeightMode) -> Result<Self> {
        let entries = entries_from_rows(character.foreground(), mode)?;
        Ok(Self::new(character.character_id, entries))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Convert non-background rows to weighted entries
pub fn entries_from_rows(rows: &[PaletteRow], mode: WeightMode) -> Result<Vec<PaletteEntry>> {
    rows.iter()
        .map(|row| {
            let weight = match mode {
                WeightMode::Adjusted => row.adjusted_percent.unwrap_or(0.0),
                WeightMode::Unweighted => 1.0,
            };
            Ok(PaletteEntry::new(row.rgb()?, weight))
        })
        .collect()
}

impl SimilarityStrategy {
    /// Score two palettes in [0, 1]
    ///
    /// # Errors
    ///
    /// Returns `EmptyPalette` naming the first palette without colors
    pub fn score(&self, a: &CharacterPalette, b: &CharacterPalette) -> Result<f64> {
        for candidate in [a, b] {
            if candidate.is_empty() {
                return Err(PaletteError::empty_palette(candidate.character_id.as_str()));
            }
        }

        let score = match self {
            SimilarityStrategy::WeightedCentroid => weighted_centroid_similarity(&a.entries, &b.entries),
            SimilarityStrategy::PerceptualNearestNeighbor => {
                perceptual_nearest_neighbor_similarity(&a.entries, &b.entries)
            }
            SimilarityStrategy::FlattenedCosine => flattened_cosine_similarity(&a.entries, &b.entries),
        };
        Ok(score.clamp(0.0, 1.0))
    }
}

/// Cosine similarity of the two weighted color sums; 0 on a zero-norm sum
pub fn weighted_centroid_similarity(a: &[PaletteEntry], b: &[PaletteEntry]) -> f64 {
    cosine(&weighted_sum(a), &weighted_sum(b))
}

/// `1 / (1 + d)`, `d` the mean of both directional mean nearest distances
/// measured in 8-bit channel units
///
/// Black against white scores about 0.0023.
pub fn perceptual_nearest_neighbor_similarity(a: &[PaletteEntry], b: &[PaletteEntry]) -> f64 {
    let average = (mean_nearest_distance(a, b) + mean_nearest_distance(b, a)) / 2.0;
    1.0 / (1.0 + average * CHANNEL_MAX)
}

/// Cosine similarity of the concatenated weighted colors, zero-padded to equal length
pub fn flattened_cosine_similarity(a: &[PaletteEntry], b: &[PaletteEntry]) -> f64 {
    let length = a.len().max(b.len()) * 3;
    cosine(&flatten(a, length), &flatten(b, length))
}

fn weighted_sum(entries: &[PaletteEntry]) -> [f64; 3] {
    entries.iter().fold([0.0; 3], |mut acc, entry| {
        for (sum, channel) in acc.iter_mut().zip(entry.rgb) {
            *sum += entry.weight * channel;
        }
        acc
    })
}

fn flatten(entries: &[PaletteEntry], length: usize) -> Vec<f64> {
    let mut flat: Vec<f64> = entries
        .iter()
        .flat_map(|entry| entry.rgb.map(|channel| channel * entry.weight))
        .collect();
    flat.resize(length, 0.0);
    flat
}

fn mean_nearest_distance(from: &[PaletteEntry], to: &[PaletteEntry]) -> f64 {
    if from.is_empty() {
        return 0.0;
    }
    let total: f64 = from
        .iter()
        .map(|entry| {
            to.iter()
                .map(|other| euclidean_distance(entry.rgb, other.rgb))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    total / from.len() as f64
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm = |v: &[f64]| v.iter().map(|x| x * x).sum::<f64>().sqrt();
    let denominator = norm(a) * norm(b);
    if denominator > 0.0 {
        dot / denominator
    } else {
        0.0
    }
}
