//! Default parameters and fixed values for palette extraction and export
//!
//! Compile-time constants grouped by pipeline stage. Runtime overrides live
//! in [`crate::config`].

/// Palette extraction defaults
pub mod extraction {
    /// Number of dominant colors extracted per image
    pub const DEFAULT_CLUSTER_COUNT: usize = 5;

    /// Images are resized to this size before clustering
    pub const DEFAULT_RESIZE_WIDTH: u32 = 100;
    pub const DEFAULT_RESIZE_HEIGHT: u32 = 100;

    /// Seed for the k-means++ initialization
    pub const DEFAULT_SEED: u64 = 0;

    /// Lloyd iteration cap per clustering run
    pub const DEFAULT_MAX_ITERATIONS: usize = 300;

    /// Centroid movement below which a run is considered converged
    pub const DEFAULT_CONVERGENCE: f32 = 1e-4;

    /// Independent clustering runs; the run with the lowest SSE is kept
    pub const DEFAULT_RUNS: usize = 10;

    /// Cluster labels are stored as u8 by the clustering backend
    pub const MAX_CLUSTER_COUNT: usize = 255;
}

/// Palette table layout
pub mod table {
    /// Archetype assigned to characters with no archetype information
    pub const DEFAULT_ARCHETYPE: &str = "Unassigned";

    /// Percent total of one image's rows
    pub const FULL_PERCENT: f64 = 100.0;

    /// CSV column names
    pub const COLUMN_FILE_NAME: &str = "File name";
    pub const COLUMN_ARCHETYPES: &str = "Archetypes";
    pub const COLUMN_HEX_COLOR: &str = "HEX color";
    pub const COLUMN_PERCENT: &str = "Percent";
    pub const COLUMN_ADJUSTED_PERCENT: &str = "Percent without background";
}
