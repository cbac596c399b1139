//! Batch driver: images → palette table → per-archetype similarity matrices
//!
//! Input layout for an image directory:
//!
//! ```text
//! characters/
//!   loner.png            -> archetype = default_archetype
//!   Hero/knight.png      -> archetype "Hero", character "knight"
//!   Hero/paladin.jpg
//!   Villain/lich.png
//! ```
//!
//! A `.csv` or spreadsheet workbook input path is read as a previously
//! written palette table and only the similarity stage runs.
//!
//! Individual images that fail are logged, collected in the report, and
//! skipped; the run itself only fails on configuration or I/O errors.

use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::color::{ColorSample, PaletteExtractor};
use crate::config::PipelineConfig;
use crate::image_loader::is_supported_image;
use crate::similarity::{ArchetypeSimilarity, SimilarityEngine, SimilarityMatrix};
use crate::table::{self, BatchFailure, ImageSource, PaletteTable, PaletteTableBuilder};
use crate::{PaletteError, Result};

/// Result of one batch run
#[derive(Debug)]
pub struct BatchReport {
    pub table: PaletteTable,
    pub matrices: Vec<ArchetypeSimilarity>,
    /// Inputs skipped before the similarity stage
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Characters that made it into the table
    pub fn processed(&self) -> usize {
        self.table.characters().count()
    }

    /// Inputs skipped during extraction or table building
    pub fn skipped(&self) -> usize {
        self.failures.len()
    }

    /// Matrix for one archetype
    pub fn matrix(&self, archetype: &str) -> Option<&SimilarityMatrix> {
        self.matrices
            .iter()
            .map(|entry| &entry.matrix)
            .find(|matrix| matrix.archetype() == archetype)
    }

    /// Characters left out of matrices for lack of non-background colors
    pub fn omitted(&self) -> impl Iterator<Item = &BatchFailure> {
        self.matrices.iter().flat_map(|entry| entry.omitted.iter())
    }
}

/// List the images of an input directory with their archetype labels
///
/// Files directly in `dir` belong to `default_archetype`; each immediate
/// subdirectory is an archetype. Hidden entries and unsupported files are
/// ignored. A file path yields a single source. Sources are sorted by path.
pub fn find_image_sources(dir: &Path, default_archetype: &str) -> Result<Vec<ImageSource>> {
    let mut sources = Vec::new();

    if dir.is_file() {
        if let Some(source) = image_source(dir, default_archetype) {
            sources.push(source);
        }
        return Ok(sources);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            let archetype = name.to_string();
            for inner in fs::read_dir(&path)? {
                let inner = inner?.path();
                if inner.is_file() {
                    sources.extend(image_source(&inner, &archetype));
                }
            }
        } else if path.is_file() {
            sources.extend(image_source(&path, default_archetype));
        }
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}

fn image_source(path: &Path, archetype: &str) -> Option<ImageSource> {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    if hidden || !is_supported_image(path) {
        tracing::debug!(path = %path.display(), "Ignoring non-image file");
        return None;
    }

    let character_id = path.file_stem()?.to_str()?.to_string();
    Some(ImageSource {
        path: path.to_path_buf(),
        character_id,
        archetype: archetype.to_string(),
    })
}

/// Configured extractor, similarity engine and batch settings
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    extractor: PaletteExtractor,
    engine: SimilarityEngine,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the configuration is out of range
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let extractor = PaletteExtractor::with_config(config.extraction.clone())?;
        let engine = SimilarityEngine::new(config.similarity);
        Ok(Self {
            config,
            extractor,
            engine,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on the configured input path
    pub fn run(&self) -> Result<BatchReport> {
        let input = self.config.input_path.as_path();
        if table::is_table_path(input) {
            self.run_table(input)
        } else {
            self.run_images(input)
        }
    }

    /// Extract every image under `dir`, build the table, score each archetype
    pub fn run_images(&self, dir: &Path) -> Result<BatchReport> {
        let sources = find_image_sources(dir, &self.config.default_archetype)?;
        tracing::info!(
            path = %dir.display(),
            images = sources.len(),
            parallel = self.config.batch.parallel,
            "Extracting palettes"
        );

        let outcomes = self.extract_all(sources)?;
        let mut builder = PaletteTableBuilder::new();
        builder.extend_outcomes(outcomes);
        let (table, failures) = builder.into_parts();

        if let Some(output) = &self.config.output_path {
            table::write_table_file(&table, output, self.config.output.include_archetype)?;
        }

        self.finish(table, failures)
    }

    /// Score each archetype of a previously written table (CSV or workbook)
    pub fn run_table(&self, path: &Path) -> Result<BatchReport> {
        let table = table::load_table(path, &self.config.default_archetype)?;
        self.finish(table, Vec::new())
    }

    /// Similarity matrices for every archetype of `table`
    pub fn similarity(&self, table: &PaletteTable) -> Result<Vec<ArchetypeSimilarity>> {
        self.engine.all_matrices(table)
    }

    fn finish(&self, table: PaletteTable, failures: Vec<BatchFailure>) -> Result<BatchReport> {
        let matrices = self.similarity(&table)?;
        let report = BatchReport {
            table,
            matrices,
            failures,
        };

        tracing::info!(
            processed = report.processed(),
            skipped = report.skipped(),
            omitted = report.omitted().count(),
            archetypes = report.matrices.len(),
            "Batch complete"
        );
        Ok(report)
    }

    /// Extract all sources, sequentially or on a worker pool
    pub fn extract_all(
        &self,
        sources: Vec<ImageSource>,
    ) -> Result<Vec<(ImageSource, Result<Vec<ColorSample>>)>> {
        if !self.config.batch.parallel {
            return Ok(sources
                .into_iter()
                .map(|source| {
                    let outcome = self.extract_one(&source);
                    (source, outcome)
                })
                .collect());
        }

        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.config.batch.threads {
            pool = pool.num_threads(threads);
        }
        let pool = pool
            .build()
            .map_err(|e| PaletteError::config("Failed to start extraction workers", e))?;

        Ok(pool.install(|| {
            sources
                .into_par_iter()
                .map(|source| {
                    let outcome = self.extract_one(&source);
                    (source, outcome)
                })
                .collect()
        }))
    }

    /// Extract one image, honoring the per-image time limit
    pub fn extract_one(&self, source: &ImageSource) -> Result<Vec<ColorSample>> {
        let started = Instant::now();
        let outcome = match self.config.batch.timeout_ms {
            None => self.extractor.extract_path(&source.path),
            Some(limit_ms) => self.extract_with_timeout(source, limit_ms),
        };

        tracing::debug!(
            path = %source.path.display(),
            character = %source.character_id,
            archetype = %source.archetype,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "Image processed"
        );
        outcome
    }

    fn extract_with_timeout(&self, source: &ImageSource, limit_ms: u64) -> Result<Vec<ColorSample>> {
        let (sender, receiver) = mpsc::channel();
        let extractor = self.extractor.clone();
        let path = source.path.clone();
        let limit = Duration::from_millis(limit_ms);
        // An abandoned worker stops starting new clustering runs after this.
        let deadline = Instant::now() + limit;

        thread::Builder::new()
            .name("palette-extract".into())
            .spawn(move || {
                // The receiver is gone once the caller timed out.
                let _ = sender.send(extractor.extract_path_until(&path, Some(deadline)));
            })?;

        match receiver.recv_timeout(limit) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(PaletteError::Timeout {
                path: source.path.clone(),
                limit_ms,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(PaletteError::ImageRead {
                message: format!("Extraction worker for {} stopped", source.path.display()),
                source: None,
            }),
        }
    }
}
