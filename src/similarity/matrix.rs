//! Per-archetype similarity matrices
//!
//! A matrix covers the characters of one archetype in lexicographic order.
//! Only the upper triangle is scored; the lower triangle mirrors it and the
//! diagonal is fixed at 1.0. Matrices are rebuilt from the table on every
//! call.

use serde::{Deserialize, Serialize};

use crate::config::SimilarityConfig;
use crate::similarity::strategy::{CharacterPalette, SimilarityStrategy, WeightMode};
use crate::table::{BatchFailure, PaletteTable};
use crate::{PaletteError, Result};

/// What to do with a character whose palette is empty after background removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyPalettePolicy {
    /// Leave the character out of the matrix and report it
    Omit,
    /// Abort the archetype with `EmptyPalette`
    FailFast,
}

/// Square, symmetric similarity matrix over labeled characters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatrix {
    archetype: String,
    labels: Vec<String>,
    /// Row-major `labels.len()²` scores
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn archetype(&self) -> &str {
        &self.archetype
    }

    /// Character labels in matrix order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    /// Score at `(row, column)`
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range
    pub fn get(&self, row: usize, column: usize) -> f64 {
        assert!(row < self.size() && column < self.size(), "matrix index out of range");
        self.values[row * self.size() + column]
    }

    /// One row of scores
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of range
    pub fn row(&self, row: usize) -> &[f64] {
        assert!(row < self.size(), "matrix row out of range");
        let n = self.size();
        &self.values[row * n..(row + 1) * n]
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Score between two characters by label
    pub fn by_label(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.get(self.index_of(a)?, self.index_of(b)?))
    }
}

/// A matrix together with the characters left out of it
#[derive(Debug)]
pub struct ArchetypeSimilarity {
    pub matrix: SimilarityMatrix,
    pub omitted: Vec<BatchFailure>,
}

/// Similarity engine: one strategy, weight mode and empty-palette policy
#[derive(Debug, Clone, Copy)]
pub struct SimilarityEngine {
    strategy: SimilarityStrategy,
    weight_mode: WeightMode,
    policy: EmptyPalettePolicy,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(SimilarityConfig::default())
    }
}

impl SimilarityEngine {
    pub fn new(config: SimilarityConfig) -> Self {
        Self {
            strategy: config.strategy,
            weight_mode: config.weight_mode,
            policy: config.empty_palette_policy,
        }
    }

    pub fn strategy(&self) -> SimilarityStrategy {
        self.strategy
    }

    pub fn weight_mode(&self) -> WeightMode {
        self.weight_mode
    }

    /// Score one pair with the configured strategy
    pub fn score(&self, a: &CharacterPalette, b: &CharacterPalette) -> Result<f64> {
        self.strategy.score(a, b)
    }

    /// Assemble the matrix for one archetype from prepared palettes
    ///
    /// # Errors
    ///
    /// Returns `EmptyPalette` under [`EmptyPalettePolicy::FailFast`]
    pub fn build_matrix(
        &self,
        archetype: &str,
        mut palettes: Vec<CharacterPalette>,
    ) -> Result<ArchetypeSimilarity> {
        let mut omitted = Vec::new();
        if self.policy == EmptyPalettePolicy::FailFast {
            if let Some(empty) = palettes.iter().find(|p| p.is_empty()) {
                return Err(PaletteError::empty_palette(empty.character_id.as_str()));
            }
        } else {
            palettes.retain(|palette| {
                if !palette.is_empty() {
                    return true;
                }
                tracing::warn!(
                    archetype,
                    character = %palette.character_id,
                    "Omitting character with no non-background colors"
                );
                omitted.push(BatchFailure {
                    input: format!("{}/{}", archetype, palette.character_id),
                    error: PaletteError::empty_palette(palette.character_id.as_str()),
                });
                false
            });
        }

        palettes.sort_by(|a, b| a.character_id.cmp(&b.character_id));

        let n = palettes.len();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let score = self.strategy.score(&palettes[i], &palettes[j])?;
                values[i * n + j] = score;
                values[j * n + i] = score;
            }
        }

        tracing::debug!(
            archetype,
            characters = n,
            strategy = ?self.strategy,
            "Similarity matrix built"
        );

        Ok(ArchetypeSimilarity {
            matrix: SimilarityMatrix {
                archetype: archetype.to_string(),
                labels: palettes.into_iter().map(|p| p.character_id).collect(),
                values,
            },
            omitted,
        })
    }

    /// Build the matrix for one archetype of a table
    pub fn archetype_matrix(&self, table: &PaletteTable, archetype: &str) -> Result<ArchetypeSimilarity> {
        let palettes = table
            .characters()
            .filter(|character| character.archetype == archetype)
            .map(|character| CharacterPalette::from_rows(&character, self.weight_mode))
            .collect::<Result<Vec<_>>>()?;
        self.build_matrix(archetype, palettes)
    }

    /// Build one matrix per archetype, in archetype order
    pub fn all_matrices(&self, table: &PaletteTable) -> Result<Vec<ArchetypeSimilarity>> {
        table
            .archetypes()
            .into_iter()
            .map(|archetype| self.archetype_matrix(table, archetype))
            .collect()
    }
}
