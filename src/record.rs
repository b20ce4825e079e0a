use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CertError, Result};
use crate::photos::{is_valid_photo_key, photo_path};

/// Format used for the "Added At" column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row of the Records sheet, in column order.
pub const HEADERS: [&str; 6] = [
    "Product Description",
    "Grade",
    "Company",
    "Certificate No",
    "Added At",
    "Certificate Photo",
];

/// Column index (0-based) of the certificate number, the hyperlinked cell.
pub const CERTIFICATE_COLUMN: u16 = 3;

/// The four fields a user enters for a certificate.
///
/// Timestamp and photo path are derived when the record is stamped, see
/// [`CertificateRecord::stamp`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub product_description: String,
    pub grade: String,
    pub company: String,
    pub certificate_number: String,
}

impl NewRecord {
    pub fn new(
        product_description: impl Into<String>,
        grade: impl Into<String>,
        company: impl Into<String>,
        certificate_number: impl Into<String>,
    ) -> Self {
        NewRecord {
            product_description: product_description.into(),
            grade: grade.into(),
            company: company.into(),
            certificate_number: certificate_number.into(),
        }
    }

    /// Check that all four fields are filled in.
    ///
    /// Whitespace-only values count as missing. The error lists every blank
    /// field, in form order. A certificate number that would place its photo
    /// outside the photo directory is rejected as well.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&'static str> = [
            ("product description", &self.product_description),
            ("grade", &self.grade),
            ("company", &self.company),
            ("certificate number", &self.certificate_number),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(CertError::MissingFields(missing));
        }
        if !is_valid_photo_key(&self.certificate_number) {
            return Err(CertError::InvalidCertificateNumber(
                self.certificate_number.clone(),
            ));
        }
        Ok(())
    }
}

/// A certificate row as it is written to the Records sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    pub product_description: String,
    pub grade: String,
    pub company: String,
    pub certificate_number: String,
    pub added_at: NaiveDateTime,
    pub photo_path: PathBuf,
}

impl CertificateRecord {
    /// Fill in the derived fields of a new record.
    ///
    /// The photo path only depends on `photo_dir` and the certificate
    /// number; whether the file exists is not checked here.
    pub fn stamp(new: NewRecord, photo_dir: &Path, added_at: NaiveDateTime) -> Self {
        let photo_path = photo_path(photo_dir, &new.certificate_number);
        CertificateRecord {
            product_description: new.product_description,
            grade: new.grade,
            company: new.company,
            certificate_number: new.certificate_number,
            // Sub-second precision is not representable in the sheet
            added_at: added_at.with_nanosecond(0).unwrap_or(added_at),
            photo_path,
        }
    }

    /// Stamp with the current local time.
    pub fn stamp_now(new: NewRecord, photo_dir: &Path) -> Self {
        Self::stamp(new, photo_dir, Local::now().naive_local())
    }

    pub fn added_at_text(&self) -> String {
        self.added_at.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn photo_path_text(&self) -> String {
        self.photo_path.display().to_string()
    }

    /// The six cell values of this record, in [`HEADERS`] order.
    pub fn cells(&self) -> [String; 6] {
        [
            self.product_description.clone(),
            self.grade.clone(),
            self.company.clone(),
            self.certificate_number.clone(),
            self.added_at_text(),
            self.photo_path_text(),
        ]
    }
}
