use thiserror::Error;

/// Errors raised by the record store, the image store and the database reader.
#[derive(Debug, Error)]
pub enum CertError {
    /// One or more of the four user-entered fields was blank.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// The certificate number cannot be used as a photo file name.
    #[error("invalid certificate number {0:?}: must not contain path separators or \"..\"")]
    InvalidCertificateNumber(String),

    /// The submitted form could not be decoded.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to read workbook: {0}")]
    WorkbookRead(#[from] calamine::XlsxError),

    /// A Records row could not be turned back into a certificate record.
    #[error("malformed record at row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("database query failed: {0}")]
    Query(#[source] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, CertError>;
