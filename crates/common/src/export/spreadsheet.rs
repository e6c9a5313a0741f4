//! Spreadsheet rendering of an export table
//!
//! Blocking; callers run these on the blocking pool.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use tracing::warn;

use super::schema::ColumnSpec;
use super::{temp_path, ExportError};

/// Excel's per-cell character limit
pub const MAX_CELL_CHARS: usize = 32_767;

/// Write a single-sheet workbook: bold frozen header row, then one row per
/// data row. Empty values are left as blank cells.
///
/// The workbook is saved beside the target and renamed over it.
pub fn write_workbook(
    path: &Path,
    sheet_name: &str,
    columns: &[ColumnSpec],
    rows: &[Vec<String>],
) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, column.header, &header_format)?;
        worksheet.set_column_width(col, column.width)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, row) in rows.iter().enumerate() {
        let row_num = (index + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let value = match value.char_indices().nth(MAX_CELL_CHARS) {
                Some((cut, _)) => {
                    warn!(
                        sheet = sheet_name,
                        row = row_num,
                        column = columns.get(col).map(|c| c.header).unwrap_or_default(),
                        chars = value.chars().count(),
                        "Truncating value to the spreadsheet cell limit"
                    );
                    &value[..cut]
                }
                None => value.as_str(),
            };
            worksheet.write_string(row_num, col as u16, value)?;
        }
    }

    let tmp = temp_path(path);
    workbook.save(&tmp)?;
    std::fs::rename(&tmp, path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Read a sheet back as rows keyed by header text with whitespace stripped.
/// The first row is the header.
pub fn read_workbook(
    path: &Path,
    sheet_name: &str,
) -> Result<Vec<BTreeMap<String, String>>, ExportError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook.worksheet_range(sheet_name)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let keys: Vec<String> = header
        .iter()
        .map(|cell| super::schema::column_key(&cell_text(cell)))
        .collect();

    Ok(rows
        .map(|row| {
            keys.iter()
                .zip(row.iter().map(cell_text).chain(std::iter::repeat(String::new())))
                .map(|(key, value)| (key.clone(), value))
                .collect()
        })
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
