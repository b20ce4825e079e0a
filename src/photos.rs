use log::{debug, info};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};

use crate::error::{CertError, Result};

/// Extension every stored photo gets, whatever was uploaded.
pub const PHOTO_EXTENSION: &str = "jpg";

/// Path of the photo for `certificate_number` inside `directory`.
///
/// This is the only place the `{directory}/{certificate_number}.jpg` layout
/// is spelled out; the record store links to the same path.
pub fn photo_path(directory: &Path, certificate_number: &str) -> PathBuf {
    directory.join(format!("{}.{}", certificate_number, PHOTO_EXTENSION))
}

/// Whether `certificate_number` names a file directly inside the photo
/// directory: no path separators and no `..`.
pub fn is_valid_photo_key(certificate_number: &str) -> bool {
    !certificate_number.contains(['/', '\\']) && !certificate_number.contains("..")
}

/// Store an uploaded photo for a certificate.
///
/// The bytes are written verbatim; no format check is done, and a photo
/// already stored under the same certificate number is replaced.
///
/// # Arguments
/// * `certificate_number` - Key of the photo
/// * `raw_bytes` - Uploaded file content
/// * `directory` - Photo directory, created if missing
///
/// # Returns
/// * `Result<PathBuf>` - Path of the written file
pub fn save_photo(certificate_number: &str, raw_bytes: &[u8], directory: &Path) -> Result<PathBuf> {
    if !is_valid_photo_key(certificate_number) {
        return Err(CertError::InvalidCertificateNumber(certificate_number.to_string()));
    }
    create_dir_all(directory)?;

    let path = photo_path(directory, certificate_number);
    if path.exists() {
        debug!("replacing existing photo {}", path.display());
    }
    fs::write(&path, raw_bytes)?;

    info!(
        "saved photo for certificate {} ({} bytes) to {}",
        certificate_number,
        raw_bytes.len(),
        path.display()
    );
    Ok(path)
}
