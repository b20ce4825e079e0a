use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::error::{CertError, Result};
use crate::record::{CertificateRecord, HEADERS, TIMESTAMP_FORMAT};
use crate::search::Table;
use crate::workbook::RECORDS_SHEET;

/// Load the Records sheet of a workbook as text.
///
/// The first row becomes the headers, every following row is kept as-is.
/// Nothing is cached: each call opens and reads the file again.
///
/// # Arguments
/// * `filepath` - Path to the workbook
///
/// # Returns
/// * `Result<Option<Table>>` - The sheet contents, or `None` if the file does not exist
///
/// # Examples
/// ```no_run
/// use certbook::loader::read_table;
///
/// match read_table("data/workbooks/certificate_records.xlsx") {
///     Ok(Some(table)) => println!("{} records", table.rows.len()),
///     Ok(None) => println!("no records yet"),
///     Err(e) => eprintln!("Error reading workbook: {}", e),
/// }
/// ```
pub fn read_table(filepath: impl AsRef<Path>) -> Result<Option<Table>> {
    let filepath = filepath.as_ref();
    if !filepath.is_file() {
        return Ok(None);
    }

    let mut workbook: Xlsx<_> = open_workbook(filepath)?;
    let range = workbook.worksheet_range(RECORDS_SHEET)?;

    Ok(Some(range_to_table(&range)))
}

/// Load the Records sheet back into typed records.
///
/// Returns an empty list when no workbook exists. A row with fewer than six
/// cells or an unparseable timestamp fails the whole read.
pub fn read_records(filepath: impl AsRef<Path>) -> Result<Vec<CertificateRecord>> {
    let Some(table) = read_table(filepath)? else {
        return Ok(Vec::new());
    };

    table
        .rows
        .iter()
        .enumerate()
        // Row 1 is the header
        .map(|(i, cells)| record_from_row(i + 2, cells))
        .collect()
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());

    let headers = rows.next().unwrap_or_default();
    Table {
        headers,
        rows: rows.collect(),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn record_from_row(row: usize, cells: &[String]) -> Result<CertificateRecord> {
    match cells {
        [description, grade, company, number, added_at, photo, ..] => {
            let added_at = NaiveDateTime::parse_from_str(added_at, TIMESTAMP_FORMAT).map_err(|e| {
                CertError::MalformedRow {
                    row,
                    reason: format!("bad timestamp {:?}: {}", added_at, e),
                }
            })?;

            Ok(CertificateRecord {
                product_description: description.clone(),
                grade: grade.clone(),
                company: company.clone(),
                certificate_number: number.clone(),
                added_at,
                photo_path: PathBuf::from(photo),
            })
        }
        _ => Err(CertError::MalformedRow {
            row,
            reason: format!("expected {} cells, found {}", HEADERS.len(), cells.len()),
        }),
    }
}
