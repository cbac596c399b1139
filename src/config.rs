//! Configuration structures for the palette pipeline.
//!
//! This module defines all tunable parameters, organized into groups for
//! extraction, similarity scoring, batch execution, and table export.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use character_palettes::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("palettes.json"))?;
//!
//! // Or use defaults
//! let config = PipelineConfig::default();
//! # Ok::<(), character_palettes::PaletteError>(())
//! ```
//!
//! Every section is `#[serde(default)]`, so a file only needs the fields it
//! changes.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{extraction, table};
use crate::similarity::{EmptyPalettePolicy, SimilarityStrategy, WeightMode};
use crate::{PaletteError, Result};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Image directory, or a previously written palette table (`.csv`)
    pub input_path: PathBuf,

    /// Where the palette table CSV is written; `None` skips the export
    pub output_path: Option<PathBuf>,

    /// Archetype for images directly in the input directory and for table
    /// rows without an archetype column
    pub default_archetype: String,

    pub extraction: ExtractionConfig,
    pub similarity: SimilarityConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

/// Palette extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Number of colors extracted per image
    pub cluster_count: usize,

    /// Resize target applied before clustering
    pub resize_width: u32,
    pub resize_height: u32,

    /// Resampling filter used for the resize
    pub resize_filter: ResizeFilter,

    /// Seed of the first clustering run; run `i` uses `seed + i`
    pub seed: u64,

    /// Iteration cap per clustering run
    pub max_iterations: usize,

    /// Convergence threshold for centroid movement
    pub convergence: f32,

    /// Number of clustering runs; the run with the lowest within-cluster SSE wins
    pub runs: usize,
}

/// Resampling filters, mirroring `image::imageops::FilterType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Similarity scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub strategy: SimilarityStrategy,
    pub weight_mode: WeightMode,
    pub empty_palette_policy: EmptyPalettePolicy,
}

/// Batch execution parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Extract images on a rayon worker pool
    pub parallel: bool,

    /// Worker count for the pool; `None` uses rayon's default
    pub threads: Option<usize>,

    /// Per-image time limit in milliseconds; `None` waits indefinitely
    pub timeout_ms: Option<u64>,
}

/// Palette table export options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write an `Archetypes` column after `File name`
    pub include_archetype: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("characters"),
            output_path: None,
            default_archetype: table::DEFAULT_ARCHETYPE.to_string(),
            extraction: ExtractionConfig::default(),
            similarity: SimilarityConfig::default(),
            batch: BatchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            cluster_count: extraction::DEFAULT_CLUSTER_COUNT,
            resize_width: extraction::DEFAULT_RESIZE_WIDTH,
            resize_height: extraction::DEFAULT_RESIZE_HEIGHT,
            resize_filter: ResizeFilter::CatmullRom,
            seed: extraction::DEFAULT_SEED,
            max_iterations: extraction::DEFAULT_MAX_ITERATIONS,
            convergence: extraction::DEFAULT_CONVERGENCE,
            runs: extraction::DEFAULT_RUNS,
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            strategy: SimilarityStrategy::WeightedCentroid,
            weight_mode: WeightMode::Adjusted,
            empty_palette_policy: EmptyPalettePolicy::Omit,
        }
    }
}

impl ExtractionConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 || self.cluster_count > extraction::MAX_CLUSTER_COUNT {
            return Err(PaletteError::invalid_parameter("cluster_count", self.cluster_count));
        }
        if self.resize_width == 0 {
            return Err(PaletteError::invalid_parameter("resize_width", self.resize_width));
        }
        if self.resize_height == 0 {
            return Err(PaletteError::invalid_parameter("resize_height", self.resize_height));
        }
        if self.runs == 0 {
            return Err(PaletteError::invalid_parameter("runs", self.runs));
        }
        if self.max_iterations == 0 {
            return Err(PaletteError::invalid_parameter("max_iterations", self.max_iterations));
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Check every section's parameter ranges
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        if self.batch.threads == Some(0) {
            return Err(PaletteError::invalid_parameter("batch.threads", 0));
        }
        if self.batch.timeout_ms == Some(0) {
            return Err(PaletteError::invalid_parameter("batch.timeout_ms", 0));
        }
        if self.default_archetype.trim().is_empty() {
            return Err(PaletteError::invalid_parameter("default_archetype", "\"\""));
        }
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PaletteError::config(format!("Failed to parse {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PaletteError::config("Failed to serialize configuration", e))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
