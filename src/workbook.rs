use chrono::Local;
use log::{debug, info, warn};
use rust_xlsxwriter::{Format, Image, Url, Workbook, Worksheet};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::loader;
use crate::record::{CERTIFICATE_COLUMN, CertificateRecord, HEADERS, NewRecord};
use crate::search::Table;

/// Name of the sheet holding one row per certificate.
pub const RECORDS_SHEET: &str = "Records";

/// Name of the sheet holding the embedded certificate photos.
pub const PHOTOS_SHEET: &str = "Photos";

/// File name of the workbook inside the workbook directory.
pub const WORKBOOK_FILE: &str = "certificate_records.xlsx";

/// Spreadsheet-backed persistence for certificate records.
///
/// Every write rebuilds the whole workbook from the records it is given:
/// whatever the file held before is discarded. Callers that want records to
/// survive across writes either keep the full list themselves or use
/// [`RecordStore::merge_and_persist`].
#[derive(Debug, Clone)]
pub struct RecordStore {
    workbook_path: PathBuf,
}

impl RecordStore {
    /// Store writing to `{workbook_dir}/certificate_records.xlsx`.
    pub fn new(workbook_dir: impl AsRef<Path>) -> Self {
        RecordStore {
            workbook_path: workbook_dir.as_ref().join(WORKBOOK_FILE),
        }
    }

    pub fn workbook_path(&self) -> &Path {
        &self.workbook_path
    }

    /// Whether a workbook has been written yet.
    pub fn exists(&self) -> bool {
        self.workbook_path.is_file()
    }

    /// Stamp `new_records` and rewrite the workbook with exactly those rows.
    ///
    /// Rows from earlier calls are not kept.
    ///
    /// # Arguments
    /// * `new_records` - Records without timestamp and photo path
    /// * `photo_dir` - Directory the photo paths are derived from
    ///
    /// # Returns
    /// * `Result<PathBuf>` - Path of the written workbook
    pub fn append_and_persist(&self, new_records: &[NewRecord], photo_dir: &Path) -> Result<PathBuf> {
        let records: Vec<CertificateRecord> = new_records
            .iter()
            .cloned()
            .map(|record| CertificateRecord::stamp_now(record, photo_dir))
            .collect();

        self.write_records(&records)
    }

    /// Read the current rows back, append the stamped `new_records` and
    /// rewrite the workbook with all of them.
    ///
    /// Existing rows keep their original timestamp and photo path.
    pub fn merge_and_persist(&self, new_records: &[NewRecord], photo_dir: &Path) -> Result<PathBuf> {
        let mut records = self.load_records()?;
        let now = Local::now().naive_local();
        records.extend(
            new_records
                .iter()
                .cloned()
                .map(|record| CertificateRecord::stamp(record, photo_dir, now)),
        );

        self.write_records(&records)
    }

    /// Rebuild the workbook from already stamped records.
    ///
    /// The Records sheet gets a header row and one row per record, with the
    /// certificate number linked to its photo. The Photos sheet gets the
    /// photo of record `i` (1-based) anchored at `A{i}`, for every record
    /// whose photo file exists.
    pub fn write_records(&self, records: &[CertificateRecord]) -> Result<PathBuf> {
        if let Some(dir) = self.workbook_path.parent() {
            create_dir_all(dir)?;
        }

        if self.exists() {
            debug!(
                "discarding previous contents of {}",
                self.workbook_path.display()
            );
        }

        let mut workbook = Workbook::new();
        workbook.push_worksheet(records_sheet(records)?);
        workbook.push_worksheet(photos_sheet(records)?);
        workbook.save(&self.workbook_path)?;

        info!(
            "wrote {} certificate record(s) to {}",
            records.len(),
            self.workbook_path.display()
        );
        Ok(self.workbook_path.clone())
    }

    /// Records sheet as a table, or `None` when nothing was written yet.
    pub fn load_table(&self) -> Result<Option<Table>> {
        loader::read_table(&self.workbook_path)
    }

    /// Records sheet as typed records; empty when nothing was written yet.
    pub fn load_records(&self) -> Result<Vec<CertificateRecord>> {
        loader::read_records(&self.workbook_path)
    }
}

fn records_sheet(records: &[CertificateRecord]) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(RECORDS_SHEET)?;

    let header_format = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in record.cells().iter().enumerate() {
            let col = col as u16;
            if col == CERTIFICATE_COLUMN {
                // Written with the default hyperlink style
                let link = Url::new(file_url(&record.photo_path)?);
                worksheet.write_url_with_text(row, col, link, value.as_str())?;
            } else {
                worksheet.write_string(row, col, value.as_str())?;
            }
        }
        debug!(
            "record {} written at {}",
            record.certificate_number,
            cell_name(row, CERTIFICATE_COLUMN)
        );
    }

    worksheet.autofit();
    Ok(worksheet)
}

fn photos_sheet(records: &[CertificateRecord]) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(PHOTOS_SHEET)?;

    for (i, record) in records.iter().enumerate() {
        if !record.photo_path.is_file() {
            debug!(
                "no photo for certificate {} at {}",
                record.certificate_number,
                record.photo_path.display()
            );
            continue;
        }

        // Uploads are stored unchecked; a file that is not an image keeps its
        // link but gets no picture, like a missing photo.
        let image = match Image::new(&record.photo_path) {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    "skipping photo for certificate {} at {}: {}",
                    record.certificate_number,
                    record.photo_path.display(),
                    e
                );
                continue;
            }
        };

        let row = i as u32;
        worksheet.insert_image(row, 0, &image)?;
        debug!(
            "embedded photo for certificate {} at {}",
            record.certificate_number,
            cell_name(row, 0)
        );
    }

    Ok(worksheet)
}

/// `file:///` link to the absolute form of `path`.
///
/// Every path segment is percent-encoded so that `#`, `?`, `%` and spaces in
/// a certificate number stay part of the file name. A Windows drive
/// segment (`C:`) is kept as-is.
fn file_url(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    let text = absolute.to_string_lossy().replace('\\', "/");

    let encoded: Vec<String> = text
        .trim_start_matches('/')
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            if i == 0 && segment.len() == 2 && segment.ends_with(':') {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect();

    Ok(format!("file:///{}", encoded.join("/")))
}

/// Spreadsheet-style name of a zero-based cell position (0, 0 is "A1").
///
/// # Examples
/// ```
/// use certbook::workbook::cell_name;
///
/// assert_eq!(cell_name(0, 0), "A1");
/// assert_eq!(cell_name(1, 3), "D2");
/// assert_eq!(cell_name(9, 26), "AA10");
/// ```
pub fn cell_name(row: u32, col: u16) -> String {
    format!("{}{}", column_to_letter(col + 1), row + 1)
}

/// Convert column number to letter (A=1, B=2, etc.)
fn column_to_letter(col: u16) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}
