//! Palette table module
//!
//! Assembles per-image extraction results into one row per
//! (character, color) with background-adjusted weights, and reads or writes
//! that table as CSV. Tables kept in spreadsheet workbooks can be read too.

pub mod builder;
pub mod csv;
pub mod workbook;

use std::path::Path;

pub use builder::{
    palette_rows, ArchetypeLayout, BatchFailure, CharacterRows, ImageSource, PaletteRow,
    PaletteTable, PaletteTableBuilder,
};
pub use csv::{read_table, read_table_file, write_table, write_table_file};
pub use workbook::{is_workbook_path, read_workbook_file};

/// Whether `path` names a palette table file (CSV or workbook)
pub fn is_table_path(path: &Path) -> bool {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    is_csv || is_workbook_path(path)
}

/// Read a palette table from a CSV file or a spreadsheet workbook
pub fn load_table(path: &Path, default_archetype: &str) -> crate::Result<PaletteTable> {
    if is_workbook_path(path) {
        read_workbook_file(path, default_archetype)
    } else {
        read_table_file(path, default_archetype)
    }
}
