//! Palette table CSV export and import
//!
//! Layout written by [`write_table`]:
//!
//! ```text
//! File name,HEX color,Percent,Percent without background
//! Hero,#f4f4f4,60.00%,
//! Hero,#ff0000,40.00%,100.00%
//!
//! Villain,...
//! ```
//!
//! One blank line follows each character. With `include_archetype` an
//! `Archetypes` column is written after `File name`; [`read_table`] accepts
//! both layouts and any column order.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::constants::table::{
    COLUMN_ADJUSTED_PERCENT, COLUMN_ARCHETYPES, COLUMN_FILE_NAME, COLUMN_HEX_COLOR,
    COLUMN_PERCENT,
};
use crate::table::{PaletteRow, PaletteTable};
use crate::{PaletteError, Result};

/// Format a percentage as `NN.NN%`
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Parse `NN.NN%` or a bare number; an empty cell is `None`
pub fn parse_percent(cell: &str) -> std::result::Result<Option<f64>, String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid percent '{}'", cell))
}

/// Write the table to any writer
pub fn write_table<W: Write>(table: &PaletteTable, writer: W, include_archetype: bool) -> Result<()> {
    let mut writer = BufWriter::new(writer);

    let mut header = vec![COLUMN_FILE_NAME];
    if include_archetype {
        header.push(COLUMN_ARCHETYPES);
    }
    header.extend([COLUMN_HEX_COLOR, COLUMN_PERCENT, COLUMN_ADJUSTED_PERCENT]);
    write_record(&mut writer, &header)?;

    for character in table.characters() {
        for row in character.rows {
            let raw = format_percent(row.raw_percent);
            let adjusted = row.adjusted_percent.map(format_percent).unwrap_or_default();

            let mut record = vec![row.character_id.as_str()];
            if include_archetype {
                record.push(row.archetype.as_str());
            }
            record.extend([row.hex_color.as_str(), raw.as_str(), adjusted.as_str()]);
            write_record(&mut writer, &record)?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the table to a file, creating parent directories as needed
pub fn write_table_file(table: &PaletteTable, path: &Path, include_archetype: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_table(table, file, include_archetype)?;
    tracing::info!(path = %path.display(), rows = table.len(), "Palette table written");
    Ok(())
}

struct Columns {
    file_name: usize,
    archetype: Option<usize>,
    hex_color: usize,
    percent: usize,
    adjusted: Option<usize>,
}

impl Columns {
    fn from_header(fields: &[String], line: usize) -> Result<Self> {
        let find = |name: &str| fields.iter().position(|f| f.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| PaletteError::TableFormat {
                line,
                message: format!("missing column '{}'", name),
            })
        };

        Ok(Self {
            file_name: require(COLUMN_FILE_NAME)?,
            archetype: find(COLUMN_ARCHETYPES),
            hex_color: require(COLUMN_HEX_COLOR)?,
            percent: require(COLUMN_PERCENT)?,
            adjusted: find(COLUMN_ADJUSTED_PERCENT),
        })
    }
}

/// Read a palette table
///
/// Blank lines are ignored. Rows without an archetype (column absent or cell
/// empty) get `default_archetype`. Quoted fields may span several lines.
///
/// # Errors
///
/// Returns `TableFormat` for a missing header, missing columns, short rows,
/// unparsable percents or hex colors
pub fn read_table<R: BufRead>(reader: R, default_archetype: &str) -> Result<PaletteTable> {
    table_from_records(read_records(reader)?, default_archetype)
}

/// One parsed record and the line it starts on
pub(crate) struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Map header-located columns of `records` to table rows
///
/// The first record is the header.
pub(crate) fn table_from_records<I>(records: I, default_archetype: &str) -> Result<PaletteTable>
where
    I: IntoIterator<Item = Record>,
{
    let mut records = records.into_iter();
    let columns = match records.next() {
        Some(header) => Columns::from_header(&header.fields, header.line)?,
        None => {
            return Err(PaletteError::TableFormat {
                line: 0,
                message: "missing header".into(),
            })
        }
    };

    let mut rows = Vec::new();
    for Record { line, fields } in records {
        let format_error = |message: String| PaletteError::TableFormat { line, message };
        let cell = |column: usize| {
            fields
                .get(column)
                .map(|f| f.trim())
                .ok_or_else(|| format_error(format!("expected column {}", column + 1)))
        };
        let optional_cell = |column: Option<usize>| column.and_then(|c| fields.get(c)).map(|f| f.trim());

        let character_id = cell(columns.file_name)?;
        if character_id.is_empty() {
            return Err(format_error("empty file name".into()));
        }

        let hex_color = cell(columns.hex_color)?;
        crate::color::hex_to_rgb(hex_color).map_err(|e| format_error(e.to_string()))?;

        let raw_percent = parse_percent(cell(columns.percent)?)
            .map_err(&format_error)?
            .ok_or_else(|| format_error("empty percent".into()))?;

        let adjusted_percent = match optional_cell(columns.adjusted) {
            Some(value) => parse_percent(value).map_err(&format_error)?,
            None => None,
        };

        let archetype = optional_cell(columns.archetype)
            .filter(|a| !a.is_empty())
            .unwrap_or(default_archetype);

        rows.push(PaletteRow {
            character_id: character_id.to_string(),
            archetype: archetype.to_string(),
            hex_color: hex_color.to_lowercase(),
            raw_percent,
            adjusted_percent,
        });
    }

    Ok(PaletteTable::from_rows(rows))
}

/// Split CSV text into records, joining lines inside quoted fields
fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let (start, text) = match pending.take() {
            Some((start, mut text)) => {
                text.push('\n');
                text.push_str(&line);
                (start, text)
            }
            None if line.trim().is_empty() => continue,
            None => (index + 1, line),
        };

        match split_record(&text) {
            Some(fields) => records.push(Record { line: start, fields }),
            None => pending = Some((start, text)),
        }
    }

    match pending {
        Some((line, _)) => Err(PaletteError::TableFormat {
            line,
            message: "unterminated quoted field".into(),
        }),
        None => Ok(records),
    }
}

/// Read a palette table from a file
pub fn read_table_file(path: &Path, default_archetype: &str) -> Result<PaletteTable> {
    let file = File::open(path)?;
    let table = read_table(BufReader::new(file), default_archetype)?;
    tracing::debug!(path = %path.display(), rows = table.len(), "Palette table loaded");
    Ok(table)
}

fn write_record<W: Write>(writer: &mut W, fields: &[&str]) -> Result<()> {
    let encoded: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    writeln!(writer, "{}", encoded.join(","))?;
    Ok(())
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one CSV record into fields, honoring double-quoted fields
///
/// Returns `None` while a quoted field is still open.
fn split_record(text: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(current);
    Some(fields)
}
