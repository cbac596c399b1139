//! Dominant color extraction
//!
//! Reduces an image to a small palette of representative colors:
//! - Downsampling to a fixed size to bound clustering cost
//! - Seeded k-means clustering in RGB space (k-means++ initialization)
//! - Several independent runs, keeping the one with the lowest
//!   within-cluster sum of squared distances
//! - Centroids ordered by descending pixel share
//!
//! The output is a pure function of the image and the [`ExtractionConfig`].

use image::{DynamicImage, GenericImageView, RgbImage};
use kmeans_colors::{get_kmeans, Kmeans};
use palette::Srgb;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use crate::color::conversion::{from_unit_rgb, rgb_to_hex};
use crate::config::ExtractionConfig;
use crate::image_loader::load_image;
use crate::{PaletteError, Result};

/// One cluster of an extracted palette
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    /// Cluster centroid, rounded to 8-bit channels
    pub rgb: Srgb<u8>,
    /// Share of the resized image's pixels in this cluster (0.0-1.0)
    pub pixel_fraction: f64,
}

impl ColorSample {
    pub fn new(rgb: Srgb<u8>, pixel_fraction: f64) -> Self {
        Self { rgb, pixel_fraction }
    }

    /// Centroid as `#rrggbb`
    pub fn hex(&self) -> String {
        rgb_to_hex(self.rgb)
    }

    /// Pixel share as a percentage (0.0-100.0)
    pub fn percent(&self) -> f64 {
        self.pixel_fraction * 100.0
    }
}

/// Palette extractor implementing seeded k-means over resized pixels
#[derive(Debug, Clone, Default)]
pub struct PaletteExtractor {
    config: ExtractionConfig,
}

impl PaletteExtractor {
    /// Create an extractor with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with custom parameters
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the configuration is out of range
    pub fn with_config(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Load an image file and extract its palette
    ///
    /// # Errors
    ///
    /// Returns `ImageRead` if the file cannot be decoded, or any error of
    /// [`PaletteExtractor::extract`]
    pub fn extract_path(&self, path: &Path) -> Result<Vec<ColorSample>> {
        self.extract_path_until(path, None)
    }

    /// Like [`PaletteExtractor::extract_path`], but no further clustering
    /// run starts once `deadline` has passed
    ///
    /// The first run always completes, so a result is still produced.
    pub fn extract_path_until(
        &self,
        path: &Path,
        deadline: Option<Instant>,
    ) -> Result<Vec<ColorSample>> {
        let image = load_image(path)?;
        self.extract_until(&image, deadline)
    }

    /// Extract `cluster_count` colors from a decoded image
    ///
    /// # Returns
    ///
    /// Samples ordered by descending `pixel_fraction`, fractions summing to 1.0
    ///
    /// # Errors
    ///
    /// Returns `PaletteError` if:
    /// - The image has no pixels
    /// - The resized image has fewer distinct colors than `cluster_count`
    pub fn extract(&self, image: &DynamicImage) -> Result<Vec<ColorSample>> {
        self.extract_until(image, None)
    }

    fn extract_until(&self, image: &DynamicImage, deadline: Option<Instant>) -> Result<Vec<ColorSample>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PaletteError::ImageRead {
                message: "Image has no pixels".into(),
                source: None,
            });
        }

        let target = (self.config.resize_width, self.config.resize_height);
        let pixels = if image.dimensions() == target {
            image.to_rgb8()
        } else {
            image
                .resize_exact(target.0, target.1, self.config.resize_filter.into())
                .to_rgb8()
        };

        self.cluster_pixels_until(&pixels, deadline)
    }

    /// Cluster the pixels of an already-resized image
    pub fn cluster_pixels(&self, pixels: &RgbImage) -> Result<Vec<ColorSample>> {
        self.cluster_pixels_until(pixels, None)
    }

    fn cluster_pixels_until(&self, pixels: &RgbImage, deadline: Option<Instant>) -> Result<Vec<ColorSample>> {
        let k = self.config.cluster_count;
        let distinct = count_distinct_colors(pixels, k);
        if distinct < k {
            return Err(PaletteError::Clustering {
                requested: k,
                distinct,
            });
        }

        let buffer: Vec<Srgb<f32>> = pixels
            .pixels()
            .map(|p| Srgb::new(p[0], p[1], p[2]).into_format::<f32>())
            .collect();

        let (best, sse) = self.best_clustering(&buffer, deadline)?;

        let mut counts = vec![0usize; best.centroids.len()];
        for &label in &best.indices {
            counts[usize::from(label)] += 1;
        }

        // Stable sort: equal counts keep cluster order.
        let mut order: Vec<usize> = (0..counts.len()).collect();
        order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));

        let total = buffer.len() as f64;
        let samples: Vec<ColorSample> = order
            .into_iter()
            .map(|i| ColorSample::new(from_unit_rgb(best.centroids[i]), counts[i] as f64 / total))
            .collect();

        tracing::trace!(
            clusters = k,
            sse,
            background = %samples[0].hex(),
            "Palette clustered"
        );

        Ok(samples)
    }

    /// Run k-means `runs` times with consecutive seeds and keep the run with
    /// the lowest SSE; ties keep the earlier run
    fn best_clustering(
        &self,
        buffer: &[Srgb<f32>],
        deadline: Option<Instant>,
    ) -> Result<(Kmeans<Srgb<f32>>, f64)> {
        let mut best: Option<(Kmeans<Srgb<f32>>, f64)> = None;

        for run in 0..self.config.runs {
            if run > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::debug!(completed = run, "Clustering deadline reached");
                break;
            }

            let candidate = get_kmeans(
                self.config.cluster_count,
                self.config.max_iterations,
                self.config.convergence,
                false,
                buffer,
                self.config.seed.wrapping_add(run as u64),
            );
            let sse = within_cluster_sse(buffer, &candidate);
            if best.as_ref().map_or(true, |(_, best_sse)| sse < *best_sse) {
                best = Some((candidate, sse));
            }
        }

        best.ok_or_else(|| PaletteError::invalid_parameter("runs", self.config.runs))
    }
}

/// Sum of squared distances from each pixel to its centroid, in 8-bit units
fn within_cluster_sse(buffer: &[Srgb<f32>], clustering: &Kmeans<Srgb<f32>>) -> f64 {
    buffer
        .iter()
        .zip(&clustering.indices)
        .map(|(pixel, &label)| {
            let centroid = clustering.centroids[usize::from(label)];
            [
                pixel.red - centroid.red,
                pixel.green - centroid.green,
                pixel.blue - centroid.blue,
            ]
            .iter()
            .map(|d| {
                let d = f64::from(*d) * 255.0;
                d * d
            })
            .sum::<f64>()
        })
        .sum()
}

/// Count distinct colors, stopping once `limit` is reached
fn count_distinct_colors(pixels: &RgbImage, limit: usize) -> usize {
    let mut seen = HashSet::new();
    for pixel in pixels.pixels() {
        seen.insert(pixel.0);
        if seen.len() >= limit {
            break;
        }
    }
    seen.len()
}
