//! Palette table assembly
//!
//! Turns per-image extraction results into [`PaletteRow`]s with
//! background-adjusted weights. The first sample of every image is the
//! background row by convention (the extractor sorts by descending share);
//! the remaining rows are renormalized so the non-background mass sums to
//! 100%.

use palette::Srgb;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use crate::color::conversion::hex_to_rgb;
use crate::color::ColorSample;
use crate::constants::table::FULL_PERCENT;
use crate::{PaletteError, Result};

/// One persisted palette record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteRow {
    pub character_id: String,
    pub archetype: String,
    /// `#rrggbb`
    pub hex_color: String,
    /// Share of all pixels (0.0-100.0)
    pub raw_percent: f64,
    /// Share among non-background colors; `None` on the background row
    pub adjusted_percent: Option<f64>,
}

impl PaletteRow {
    pub fn rgb(&self) -> Result<Srgb<u8>> {
        hex_to_rgb(&self.hex_color)
    }
}

/// An image queued for extraction, with the labels its rows will carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub path: PathBuf,
    pub character_id: String,
    pub archetype: String,
}

/// An input that was skipped, with the reason
#[derive(Debug)]
pub struct BatchFailure {
    /// Image path or `archetype/character` label
    pub input: String,
    pub error: PaletteError,
}

/// Rows of one character, background first
#[derive(Debug, Clone, Copy)]
pub struct CharacterRows<'a> {
    pub character_id: &'a str,
    pub archetype: &'a str,
    pub rows: &'a [PaletteRow],
}

impl<'a> CharacterRows<'a> {
    /// The background row (first row by convention)
    pub fn background(&self) -> Option<&'a PaletteRow> {
        self.rows.first()
    }

    /// All rows after the background row
    pub fn foreground(&self) -> &'a [PaletteRow] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Number of characters in one archetype, for layout collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchetypeLayout {
    pub archetype: String,
    pub character_count: usize,
}

/// Ordered, append-only palette table
///
/// Characters are ordered by id (then archetype); each character's rows are
/// contiguous and keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaletteTable {
    rows: Vec<PaletteRow>,
    /// `(start, end)` row range of each character
    spans: Vec<(usize, usize)>,
}

impl PaletteTable {
    /// Build a table from rows in any order
    ///
    /// Rows are grouped by `(character_id, archetype)`; order within a
    /// character is preserved, so its first row stays the background row.
    pub fn from_rows(rows: impl IntoIterator<Item = PaletteRow>) -> Self {
        let mut groups: BTreeMap<(String, String), Vec<PaletteRow>> = BTreeMap::new();
        for row in rows {
            groups
                .entry((row.character_id.clone(), row.archetype.clone()))
                .or_default()
                .push(row);
        }

        let mut table = PaletteTable::default();
        for (_, group) in groups {
            let start = table.rows.len();
            table.rows.extend(group);
            table.spans.push((start, table.rows.len()));
        }
        table
    }

    pub fn rows(&self) -> &[PaletteRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Per-character row groups in table order
    pub fn characters(&self) -> impl Iterator<Item = CharacterRows<'_>> {
        self.spans.iter().map(move |&(start, end)| {
            let rows = &self.rows[start..end];
            CharacterRows {
                character_id: &rows[0].character_id,
                archetype: &rows[0].archetype,
                rows,
            }
        })
    }

    /// Look up one character's rows
    pub fn character(&self, archetype: &str, character_id: &str) -> Option<CharacterRows<'_>> {
        self.characters()
            .find(|c| c.archetype == archetype && c.character_id == character_id)
    }

    /// Distinct archetype names, sorted
    pub fn archetypes(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.archetype.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Characters grouped by archetype; both levels sorted
    pub fn by_archetype(&self) -> BTreeMap<&str, Vec<CharacterRows<'_>>> {
        let mut groups: BTreeMap<&str, Vec<CharacterRows<'_>>> = BTreeMap::new();
        for character in self.characters() {
            groups.entry(character.archetype).or_default().push(character);
        }
        for characters in groups.values_mut() {
            characters.sort_by(|a, b| a.character_id.cmp(b.character_id));
        }
        groups
    }

    /// Rows ordered by archetype, then character
    pub fn rows_by_archetype(&self) -> Vec<&PaletteRow> {
        self.by_archetype()
            .into_values()
            .flatten()
            .flat_map(|character| character.rows.iter())
            .collect()
    }

    /// Archetype count and per-archetype character counts
    pub fn layout(&self) -> Vec<ArchetypeLayout> {
        self.by_archetype()
            .into_iter()
            .map(|(archetype, characters)| ArchetypeLayout {
                archetype: archetype.to_string(),
                character_count: characters.len(),
            })
            .collect()
    }
}

/// Collects extraction results and produces a [`PaletteTable`]
#[derive(Debug, Default)]
pub struct PaletteTableBuilder {
    rows: Vec<PaletteRow>,
    seen: HashSet<(String, String)>,
    failures: Vec<BatchFailure>,
}

impl PaletteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one image's samples
    ///
    /// # Errors
    ///
    /// Returns `EmptyPalette` if `samples` is empty, and `InvalidParameter`
    /// if the character was already added under the same archetype
    pub fn push(
        &mut self,
        character_id: impl Into<String>,
        archetype: impl Into<String>,
        samples: &[ColorSample],
    ) -> Result<()> {
        let character_id = character_id.into();
        let archetype = archetype.into();

        let key = (character_id.clone(), archetype.clone());
        if self.seen.contains(&key) {
            return Err(PaletteError::invalid_parameter(
                "character_id",
                format!("duplicate '{}' in archetype '{}'", character_id, archetype),
            ));
        }

        let rows = palette_rows(&character_id, &archetype, samples)?;
        self.seen.insert(key);
        self.rows.extend(rows);
        Ok(())
    }

    /// Add one extraction outcome; failures are logged and collected
    pub fn push_outcome(&mut self, source: ImageSource, outcome: Result<Vec<ColorSample>>) {
        let result = outcome.and_then(|samples| {
            self.push(source.character_id.as_str(), source.archetype.as_str(), &samples)
        });

        if let Err(error) = result {
            tracing::warn!(
                path = %source.path.display(),
                kind = error.kind(),
                error = %error,
                "Skipping image"
            );
            self.failures.push(BatchFailure {
                input: source.path.display().to_string(),
                error,
            });
        }
    }

    pub fn extend_outcomes<I>(&mut self, outcomes: I)
    where
        I: IntoIterator<Item = (ImageSource, Result<Vec<ColorSample>>)>,
    {
        for (source, outcome) in outcomes {
            self.push_outcome(source, outcome);
        }
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    /// Finish the table; rows are ordered by character id
    pub fn build(self) -> PaletteTable {
        self.into_parts().0
    }

    /// Finish the table and hand back the collected failures
    pub fn into_parts(self) -> (PaletteTable, Vec<BatchFailure>) {
        (PaletteTable::from_rows(self.rows), self.failures)
    }
}

/// Convert one image's sorted samples into rows
///
/// The first sample is the background row. Each other row's adjusted
/// percent is its share of the non-background mass; when the background
/// covers the whole image that mass is zero and every adjusted value is 0.
///
/// # Errors
///
/// Returns `EmptyPalette` if `samples` is empty
pub fn palette_rows(
    character_id: &str,
    archetype: &str,
    samples: &[ColorSample],
) -> Result<Vec<PaletteRow>> {
    let (background, rest) = samples
        .split_first()
        .ok_or_else(|| PaletteError::empty_palette(character_id))?;

    let non_background = 1.0 - background.pixel_fraction;

    let row = |sample: &ColorSample, adjusted_percent: Option<f64>| PaletteRow {
        character_id: character_id.to_string(),
        archetype: archetype.to_string(),
        hex_color: sample.hex(),
        raw_percent: sample.percent(),
        adjusted_percent,
    };

    let mut rows = Vec::with_capacity(samples.len());
    rows.push(row(background, None));
    for sample in rest {
        let adjusted = if non_background > f64::EPSILON {
            sample.pixel_fraction / non_background * FULL_PERCENT
        } else {
            0.0
        };
        rows.push(row(sample, Some(adjusted)));
    }
    Ok(rows)
}
