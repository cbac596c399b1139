//! Integration tests for the complete palette pipeline
//!
//! These tests validate the end-to-end workflow including:
//! - Directory discovery and archetype labeling
//! - Palette extraction and background-adjusted percents
//! - Palette table export and re-import (CSV and workbook)
//! - Per-archetype similarity matrices
//! - Skipping of unreadable or unclusterable images

use character_palettes::table::{read_table_file, write_table};
use character_palettes::{
    extract_palette, run_pipeline, EmptyPalettePolicy, ExtractionConfig, PaletteError,
    Pipeline, PipelineConfig, ResizeFilter, SimilarityStrategy, WeightMode,
};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];
const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const PURPLE: [u8; 3] = [128, 0, 128];

/// 10x10 image: the first `split` columns are `left`, the rest `right`
fn write_split_png(path: &Path, left: [u8; 3], right: [u8; 3], split: u32) {
    let image = RgbImage::from_fn(10, 10, |x, _| if x < split { Rgb(left) } else { Rgb(right) });
    image.save(path).unwrap();
}

fn test_config(input: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input_path = input.to_path_buf();
    config.extraction = ExtractionConfig {
        cluster_count: 2,
        resize_width: 10,
        resize_height: 10,
        resize_filter: ResizeFilter::Nearest,
        runs: 3,
        ..ExtractionConfig::default()
    };
    config
}

/// Hero: knight and paladin share a red foreground, squire is green.
/// Villain: lich alone. A corrupt file and a text file sit at the root.
fn character_fixture(root: &Path) {
    fs::create_dir(root.join("Hero")).unwrap();
    fs::create_dir(root.join("Villain")).unwrap();
    write_split_png(&root.join("Hero").join("knight.png"), WHITE, RED, 6);
    write_split_png(&root.join("Hero").join("paladin.png"), BLACK, RED, 7);
    write_split_png(&root.join("Hero").join("squire.png"), WHITE, GREEN, 6);
    write_split_png(&root.join("Villain").join("lich.png"), BLACK, PURPLE, 6);
    fs::write(root.join("corrupt.png"), b"not a png").unwrap();
    fs::write(root.join("README.txt"), "character art").unwrap();
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_extract_two_color_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flag.png");
    write_split_png(&path, RED, BLUE, 6);

    let config = test_config(dir.path()).extraction;
    let colors = extract_palette(&path, &config).unwrap();

    assert_eq!(colors.len(), 2);
    assert_eq!(colors[0].hex(), "#ff0000");
    assert!((colors[0].pixel_fraction - 0.6).abs() < 1e-9);
    assert_eq!(colors[1].hex(), "#0000ff");
    assert!((colors[1].pixel_fraction - 0.4).abs() < 1e-9);
}

#[test]
fn test_extraction_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.png");
    let image = RgbImage::from_fn(20, 20, |x, y| {
        Rgb([(x * 13 % 256) as u8, (y * 29 % 256) as u8, ((x + y) * 7 % 256) as u8])
    });
    image.save(&path).unwrap();

    let config = ExtractionConfig::default();
    let first = extract_palette(&path, &config).unwrap();
    let second = extract_palette(&path, &config).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), config.cluster_count);
    let total: f64 = first.iter().map(|c| c.pixel_fraction).sum();
    assert!((total - 1.0).abs() < 1e-6);
}

#[test]
fn test_extract_missing_file() {
    let result = extract_palette(Path::new("nonexistent_character.png"), &ExtractionConfig::default());
    assert!(matches!(result, Err(PaletteError::ImageRead { .. })));
}

// ============================================================================
// Batch pipeline
// ============================================================================

#[test]
fn test_batch_skips_corrupt_image() {
    let dir = tempfile::tempdir().unwrap();
    character_fixture(dir.path());

    let report = run_pipeline(test_config(dir.path())).unwrap();

    assert_eq!(report.processed(), 4);
    assert_eq!(report.skipped(), 1);
    assert!(report.failures[0].input.ends_with("corrupt.png"));
    assert_eq!(report.failures[0].error.kind(), "image_read");
    assert_eq!(report.table.archetypes(), vec!["Hero", "Villain"]);
}

#[test]
fn test_background_adjusted_percent() {
    let dir = tempfile::tempdir().unwrap();
    character_fixture(dir.path());

    let report = run_pipeline(test_config(dir.path())).unwrap();
    let knight = report.table.character("Hero", "knight").unwrap();

    let background = knight.background().unwrap();
    assert_eq!(background.hex_color, "#ffffff");
    assert!((background.raw_percent - 60.0).abs() < 1e-9);
    assert_eq!(background.adjusted_percent, None);

    let foreground = knight.foreground();
    assert_eq!(foreground.len(), 1);
    assert_eq!(foreground[0].hex_color, "#ff0000");
    assert!((foreground[0].adjusted_percent.unwrap() - 100.0).abs() < 1e-9);
}

#[test]
fn test_archetype_matrices() {
    let dir = tempfile::tempdir().unwrap();
    character_fixture(dir.path());

    let report = run_pipeline(test_config(dir.path())).unwrap();

    let hero = report.matrix("Hero").unwrap();
    assert_eq!(hero.labels(), ["knight", "paladin", "squire"]);
    // Backgrounds differ but foregrounds match
    assert!((hero.by_label("knight", "paladin").unwrap() - 1.0).abs() < 1e-9);
    assert!(hero.by_label("knight", "squire").unwrap() < 1.0);
    for i in 0..hero.size() {
        assert_eq!(hero.get(i, i), 1.0);
        for j in 0..hero.size() {
            assert_eq!(hero.get(i, j), hero.get(j, i));
            assert!((0.0..=1.0).contains(&hero.get(i, j)));
        }
    }

    let villain = report.matrix("Villain").unwrap();
    assert_eq!(villain.labels(), ["lich"]);
    assert!(report.matrix("Unassigned").is_none());
}

#[test]
fn test_every_strategy_runs() {
    let dir = tempfile::tempdir().unwrap();
    character_fixture(dir.path());

    for strategy in [
        SimilarityStrategy::WeightedCentroid,
        SimilarityStrategy::PerceptualNearestNeighbor,
        SimilarityStrategy::FlattenedCosine,
    ] {
        let mut config = test_config(dir.path());
        config.similarity.strategy = strategy;
        config.similarity.weight_mode = WeightMode::Unweighted;

        let report = run_pipeline(config).unwrap();
        let hero = report.matrix("Hero").unwrap();
        let same = hero.by_label("knight", "paladin").unwrap();
        let different = hero.by_label("knight", "squire").unwrap();
        assert!(same > different, "{:?}: {} <= {}", strategy, same, different);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    character_fixture(dir.path());

    let sequential = run_pipeline(test_config(dir.path())).unwrap();

    let mut config = test_config(dir.path());
    config.batch.parallel = true;
    config.batch.threads = Some(2);
    let parallel = run_pipeline(config).unwrap();

    assert_eq!(sequential.table, parallel.table);
    assert_eq!(sequential.skipped(), parallel.skipped());
    for (a, b) in sequential.matrices.iter().zip(&parallel.matrices) {
        assert_eq!(a.matrix, b.matrix);
    }
}

#[test]
fn test_single_color_image() {
    let dir = tempfile::tempdir().unwrap();
    write_split_png(&dir.path().join("blank.png"), WHITE, WHITE, 5);

    // Two clusters cannot be found in one color
    let report = run_pipeline(test_config(dir.path())).unwrap();
    assert_eq!(report.processed(), 0);
    assert_eq!(report.failures[0].error.kind(), "clustering");

    // One cluster is only background
    let mut config = test_config(dir.path());
    config.extraction.cluster_count = 1;
    let report = run_pipeline(config).unwrap();

    let blank = report.table.character("Unassigned", "blank").unwrap();
    assert_eq!(blank.rows.len(), 1);
    assert!((blank.rows[0].raw_percent - 100.0).abs() < 1e-9);
    assert_eq!(blank.rows[0].adjusted_percent, None);

    let matrix = report.matrix("Unassigned").unwrap();
    assert_eq!(matrix.size(), 0);
    assert_eq!(report.omitted().count(), 1);
}

#[test]
fn test_fail_fast_on_empty_palette() {
    let dir = tempfile::tempdir().unwrap();
    write_split_png(&dir.path().join("blank.png"), WHITE, WHITE, 5);

    let mut config = test_config(dir.path());
    config.extraction.cluster_count = 1;
    config.similarity.empty_palette_policy = EmptyPalettePolicy::FailFast;

    let result = Pipeline::new(config).unwrap().run();
    assert!(matches!(result, Err(PaletteError::EmptyPalette { .. })));
}

// ============================================================================
// Palette table
// ============================================================================

#[test]
fn test_table_export_and_rescore() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    character_fixture(&images);
    let table_path = dir.path().join("out").join("palettes.csv");

    let mut config = test_config(&images);
    config.output_path = Some(table_path.clone());
    config.output.include_archetype = true;
    let from_images = run_pipeline(config).unwrap();

    let csv = fs::read_to_string(&table_path).unwrap();
    assert!(csv.starts_with("File name,Archetypes,HEX color,Percent,Percent without background"));
    assert!(csv.contains("knight,Hero,#ff0000,40.00%,100.00%"));

    let reloaded = read_table_file(&table_path, "Unassigned").unwrap();
    assert_eq!(reloaded.len(), from_images.table.len());
    assert_eq!(reloaded.layout(), from_images.table.layout());

    let from_table = run_pipeline(test_config(&table_path)).unwrap();
    assert_eq!(from_table.skipped(), 0);
    let a = from_images.matrix("Hero").unwrap();
    let b = from_table.matrix("Hero").unwrap();
    assert_eq!(a.labels(), b.labels());
    for i in 0..a.size() {
        for j in 0..a.size() {
            assert!((a.get(i, j) - b.get(i, j)).abs() < 1e-3);
        }
    }
}

#[test]
fn test_rescore_from_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("palettes.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    let rows = [
        ["File name", "Archetypes", "HEX color", "Percent", "Percent without background"],
        ["knight", "Hero", "#ffffff", "60.00%", ""],
        ["knight", "Hero", "#ff0000", "40.00%", "100.00%"],
        ["paladin", "Hero", "#000000", "70.00%", ""],
        ["paladin", "Hero", "#ff0000", "30.00%", "100.00%"],
        ["squire", "Hero", "#ffffff", "60.00%", ""],
        ["squire", "Hero", "#00ff00", "40.00%", "100.00%"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                sheet.write_string(r as u32, c as u16, *cell).unwrap();
            }
        }
    }
    workbook.save(&path).unwrap();

    let report = run_pipeline(test_config(&path)).unwrap();

    assert_eq!(report.processed(), 3);
    let hero = report.matrix("Hero").unwrap();
    assert_eq!(hero.labels(), ["knight", "paladin", "squire"]);
    assert!((hero.by_label("knight", "paladin").unwrap() - 1.0).abs() < 1e-9);
    assert!(hero.by_label("knight", "squire").unwrap() < 1.0);
}

#[test]
fn test_table_without_archetype_column() {
    let dir = tempfile::tempdir().unwrap();
    character_fixture(dir.path());

    let report = run_pipeline(test_config(dir.path())).unwrap();
    let mut buffer = Vec::new();
    write_table(&report.table, &mut buffer, false).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    assert!(text.starts_with("File name,HEX color,Percent,Percent without background"));
    assert!(!text.contains("Hero"));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    character_fixture(dir.path());
    let config_path = dir.path().join("palettes.json");

    test_config(dir.path()).to_json_file(&config_path).unwrap();
    let loaded = PipelineConfig::from_json_file(&config_path).unwrap();
    assert_eq!(loaded.extraction, test_config(dir.path()).extraction);

    let report = run_pipeline(loaded).unwrap();
    assert_eq!(report.processed(), 4);
}
