use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::{debug, error, info};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::types::Decimal;
use sqlx::{Column, Connection, Row, TypeInfo};

use crate::config::DatabaseSettings;
use crate::error::{CertError, Result};
use crate::search::Table;

/// The one query this reader runs: newest certificates first.
pub const CERTIFICATES_QUERY: &str = "SELECT * FROM certificates ORDER BY added_at DESC";

/// Read-only access to the certificates table.
///
/// Holds at most one connection, opened on first use and dropped by
/// [`DatabaseReader::close`].
pub struct DatabaseReader {
    settings: DatabaseSettings,
    conn: Option<MySqlConnection>,
}

impl DatabaseReader {
    pub fn new(settings: DatabaseSettings) -> Self {
        DatabaseReader {
            settings,
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the connection; a no-op while one is already held.
    pub async fn connect(&mut self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    /// Run [`CERTIFICATES_QUERY`] and render every value as text.
    ///
    /// Headers come from the result's column names, so an empty result
    /// has no headers either.
    pub async fn fetch_certificates(&mut self) -> Result<Table> {
        let conn = self.connection().await?;
        let rows: Vec<MySqlRow> = sqlx::query(CERTIFICATES_QUERY)
            .fetch_all(&mut *conn)
            .await
            .map_err(CertError::Query)?;

        let headers = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| (0..row.len()).map(|idx| value_text(row, idx)).collect())
            .collect();

        info!("fetched {} certificate row(s) from the database", rows.len());
        Ok(Table { headers, rows })
    }

    /// Close the connection if one is open.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(CertError::Connection)?;
            info!("closed database connection");
        }
        Ok(())
    }

    async fn connection(&mut self) -> Result<&mut MySqlConnection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open().await?,
        };
        Ok(self.conn.insert(conn))
    }

    async fn open(&self) -> Result<MySqlConnection> {
        let s = &self.settings;
        let options = MySqlConnectOptions::new()
            .host(&s.host)
            .port(s.port)
            .username(&s.user)
            .password(&s.password)
            .database(&s.name);

        match MySqlConnection::connect_with(&options).await {
            Ok(conn) => {
                info!("connected to database {} at {}:{}", s.name, s.host, s.port);
                Ok(conn)
            }
            Err(e) => {
                error!(
                    "database connection to {}:{} failed: {}",
                    s.host, s.port, e
                );
                Err(CertError::Connection(e))
            }
        }
    }
}

/// Render column `idx` of `row` as text; NULL and unsupported types become empty.
///
/// Unsupported types are logged at debug level with the column name and its
/// SQL type.
fn value_text(row: &MySqlRow, idx: usize) -> String {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<Decimal>, _>(idx) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return v
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        return v
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return v.map(|d| d.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
        return v.map(|t| t.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
    }

    let column = row.column(idx);
    debug!("{}", unsupported_column(column.name(), column.type_info().name()));
    String::new()
}

fn unsupported_column(name: &str, type_name: &str) -> String {
    format!(
        "column {} has unsupported type {}; rendering it as empty",
        name, type_name
    )
}
