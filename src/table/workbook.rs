//! Palette table import from spreadsheet workbooks
//!
//! Reads the first worksheet of an `.xlsx`, `.xlsm`, `.xls` or `.ods` file
//! with the same header-located columns as the CSV layout. Text cells are
//! parsed like CSV cells (`"40.00%"`, `"40"`); numeric cells are taken as
//! percent values as written.

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

use crate::table::csv::{table_from_records, Record};
use crate::table::PaletteTable;
use crate::{PaletteError, Result};

/// Workbook extensions accepted by [`read_workbook_file`]
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Whether `path` names a spreadsheet workbook
pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Read a palette table from the first worksheet of a workbook
///
/// # Errors
///
/// Returns `TableFormat` if the workbook cannot be opened, has no worksheet,
/// or its cells fail the same checks as [`crate::table::read_table`]
pub fn read_workbook_file(path: &Path, default_archetype: &str) -> Result<PaletteTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| PaletteError::TableFormat {
        line: 0,
        message: format!("cannot open workbook {}: {}", path.display(), e),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PaletteError::TableFormat {
            line: 0,
            message: format!("workbook {} has no worksheet", path.display()),
        })?
        .map_err(|e| PaletteError::TableFormat {
            line: 0,
            message: format!("cannot read worksheet: {}", e),
        })?;

    let table = table_from_records(worksheet_records(&range), default_archetype)?;
    tracing::debug!(path = %path.display(), rows = table.len(), "Palette table loaded from workbook");
    Ok(table)
}

/// Non-blank worksheet rows as records numbered like spreadsheet rows
fn worksheet_records(range: &Range<Data>) -> Vec<Record> {
    let first_row = range.start().map_or(0, |(row, _)| row as usize);

    range
        .rows()
        .enumerate()
        .filter_map(|(offset, cells)| {
            let fields: Vec<String> = cells.iter().map(cell_text).collect();
            if fields.iter().all(|f| f.trim().is_empty()) {
                return None;
            }
            Some(Record {
                line: first_row + offset + 1,
                fields,
            })
        })
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_workbook_extensions() {
        assert!(is_workbook_path(Path::new("palettes.xlsx")));
        assert!(is_workbook_path(Path::new("OLD.XLS")));
        assert!(!is_workbook_path(Path::new("palettes.csv")));
        assert!(!is_workbook_path(Path::new("palettes")));
    }

    #[test]
    fn test_read_text_and_numeric_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palettes.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in ["File name", "Archetypes", "HEX color", "Percent", "Percent without background"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        sheet.write_string(1, 0, "Hero").unwrap();
        sheet.write_string(1, 1, "Mentor").unwrap();
        sheet.write_string(1, 2, "#F4F4F4").unwrap();
        sheet.write_string(1, 3, "60.00%").unwrap();
        sheet.write_string(2, 0, "Hero").unwrap();
        sheet.write_string(2, 1, "Mentor").unwrap();
        sheet.write_string(2, 2, "#ff0000").unwrap();
        sheet.write_number(2, 3, 40.0).unwrap();
        sheet.write_number(2, 4, 100.0).unwrap();
        // Row 3 left blank
        sheet.write_string(4, 0, "Drifter").unwrap();
        sheet.write_string(4, 2, "#123456").unwrap();
        sheet.write_string(4, 3, "100%").unwrap();
        workbook.save(&path).unwrap();

        let table = read_workbook_file(&path, "Unassigned").unwrap();

        assert_eq!(table.len(), 3);
        let hero = table.character("Mentor", "Hero").unwrap();
        assert_eq!(hero.background().unwrap().hex_color, "#f4f4f4");
        assert_eq!(hero.background().unwrap().adjusted_percent, None);
        assert!((hero.foreground()[0].raw_percent - 40.0).abs() < 1e-12);
        assert_eq!(hero.foreground()[0].adjusted_percent, Some(100.0));

        let drifter = table.character("Unassigned", "Drifter").unwrap();
        assert_eq!(drifter.rows.len(), 1);
    }

    #[test]
    fn test_bad_cell_reports_spreadsheet_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "File name").unwrap();
        sheet.write_string(0, 1, "HEX color").unwrap();
        sheet.write_string(0, 2, "Percent").unwrap();
        sheet.write_string(1, 0, "Hero").unwrap();
        sheet.write_string(1, 1, "not a color").unwrap();
        sheet.write_string(1, 2, "10%").unwrap();
        workbook.save(&path).unwrap();

        assert!(matches!(
            read_workbook_file(&path, "X"),
            Err(PaletteError::TableFormat { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_workbook() {
        let result = read_workbook_file(Path::new("no/such/palettes.xlsx"), "X");
        assert!(matches!(result, Err(PaletteError::TableFormat { line: 0, .. })));
    }
}
