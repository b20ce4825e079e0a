/*!
# certbook

Record keeping for material quality certificates.

## Overview

A user enters the metadata of a certificate (product description, grade,
company, certificate number) together with a photo of the certificate. The
data is kept in an `.xlsx` workbook with the photos embedded and each
certificate number linked to its photo file. Records can be searched by
keyword, and a snapshot of the certificates table of a MySQL database can be
pulled on demand.

## Architecture

### Storage
- **Image Store** (`photos`) - one `{certificate_number}.jpg` file per certificate
- **Record Store** (`workbook`) - rebuilds the two-sheet workbook (`Records`, `Photos`)
  on every write
- **Loader** (`loader`) - reads the Records sheet back

### Queries
- **Search** (`search`) - case-insensitive substring filter over all columns
- **Database Reader** (`database`) - one fixed query against the certificates table

### Frontend Layer (feature `web`)
- **app** - axum routes for adding, searching, downloading and refreshing

## Persistence

Every write replaces the whole workbook with the records passed to it.
Records from earlier writes survive only when the caller passes them again,
which `RecordStore::merge_and_persist` does by reading them back first.

## Modules

- **config**: settings read once from the environment
- **error**: the crate error type
- **record**: certificate record types and validation
- **photos**: photo storage
- **workbook**: workbook writing
- **loader**: workbook reading
- **search**: table filtering
- **database**: certificates table snapshot
- **app**: HTTP routes and handlers
*/

pub mod config;
pub mod database;
pub mod error;
pub mod loader;
pub mod photos;
pub mod record;
pub mod search;
pub mod workbook;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the types most callers need
pub use config::{Config, DatabaseSettings, PersistMode};
pub use database::DatabaseReader;
pub use error::{CertError, Result};
pub use photos::save_photo;
pub use record::{CertificateRecord, NewRecord};
pub use search::{Table, filter};
pub use workbook::RecordStore;
