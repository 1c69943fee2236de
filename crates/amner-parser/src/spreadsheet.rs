//! Spreadsheet reader using calamine
//!
//! Reads the first sheet of an ODS, XLSX or XLS workbook as a table.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use crate::{ParserError, Result, Table};

/// Spreadsheet reader; the first row of a sheet is its header
#[derive(Debug, Default)]
pub struct SpreadsheetReader;

impl SpreadsheetReader {
    pub fn new() -> Self {
        Self
    }

    /// Convert a Data cell to string
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) => {
                // Format without unnecessary decimals
                if f.fract() == 0.0 {
                    format!("{}", *f as i64)
                } else {
                    format!("{f}")
                }
            }
            Data::Int(i) => format!("{i}"),
            Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            // Error cells carry no usable term
            Data::Error(_) => String::new(),
            Data::DateTime(dt) => format!("{dt}"),
            Data::DateTimeIso(s) => s.clone(),
            Data::DurationIso(s) => s.clone(),
        }
    }

    /// Turn a sheet range into a table
    fn range_to_table(&self, sheet_name: &str, range: &Range<Data>) -> Table {
        let mut table = Table::new();
        table.caption = Some(sheet_name.to_string());

        let mut rows_iter = range.rows();

        if let Some(first_row) = rows_iter.next() {
            table.headers = first_row.iter().map(Self::cell_to_string).collect();
        }

        // Drop rows where every cell is empty
        table.rows = rows_iter
            .map(|row| row.iter().map(Self::cell_to_string).collect::<Vec<_>>())
            .filter(|row_data: &Vec<String>| !row_data.iter().all(|s| s.is_empty()))
            .collect();

        table
    }

    /// Read the first sheet of the workbook at `path`
    pub fn read_first_sheet(&self, path: &Path) -> Result<Table> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| ParserError::SpreadsheetError(format!("{}: {e}", path.display())))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ParserError::EmptyWorkbook(path.display().to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ParserError::SpreadsheetError(format!("{sheet_name}: {e}")))?;

        let table = self.range_to_table(&sheet_name, &range);
        debug!(
            path = %path.display(),
            sheet = %sheet_name,
            rows = table.num_rows(),
            "read spreadsheet"
        );

        Ok(table)
    }
}
