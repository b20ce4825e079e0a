use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;

use crate::config::{Config, PersistMode};
use crate::database::DatabaseReader;
use crate::error::{CertError, Result};
use crate::photos::save_photo;
use crate::record::NewRecord;
use crate::search::{self, Table};
use crate::workbook::RecordStore;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Everything a request handler needs, shared across requests.
pub struct AppContext {
    pub config: Config,
    pub store: RecordStore,
    pub database: Mutex<DatabaseReader>,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        AppContext {
            store: RecordStore::new(&config.workbook_dir),
            database: Mutex::new(DatabaseReader::new(config.database.clone())),
            config,
        }
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct RecordResponse {
    status: String,
    message: String,
    workbook: String,
}

#[derive(Serialize)]
struct TableResponse {
    status: String,
    message: Option<String>,
    table: Table,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

impl IntoResponse for CertError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CertError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                format!("Please fill in the {}.", fields.join(", ")),
            ),
            CertError::InvalidUpload(_) | CertError::InvalidCertificateNumber(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            CertError::Connection(_) | CertError::Query(_) => (
                StatusCode::BAD_GATEWAY,
                format!("Refreshing data from the database failed: {}", self),
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = ErrorResponse {
            status: "error".to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router over a shared context.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/records", get(search_records).post(add_record))
        .route("/api/download", get(download_workbook))
        .route("/api/refresh", post(refresh_from_database))
        .nest_service("/photos", ServeDir::new(&ctx.config.photo_dir))
        // Photo uploads are not size-checked
        .layer(DefaultBodyLimit::disable())
        .with_state(ctx)
}

pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr.clone();
    let app = router(Arc::new(AppContext::new(config)));

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run file and workbook work off the async worker threads.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CertError::Io(std::io::Error::other(e)))?
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn add_record(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<RecordResponse>)> {
    let mut form = NewRecord::default();
    let mut photo: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CertError::InvalidUpload(e.to_string()))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();
        if field_name == "photo" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| CertError::InvalidUpload(e.to_string()))?;
            // An empty file input still sends a part
            if !bytes.is_empty() {
                photo = Some(bytes.to_vec());
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| CertError::InvalidUpload(e.to_string()))?;
        match field_name.as_str() {
            "product_description" => form.product_description = value,
            "grade" => form.grade = value,
            "company" => form.company = value,
            "certificate_number" => form.certificate_number = value,
            other => warn!("ignoring unexpected form field {:?}", other),
        }
    }

    form.validate()?;

    let workbook = blocking(move || {
        let photo_dir = &ctx.config.photo_dir;
        if let Some(bytes) = photo {
            save_photo(&form.certificate_number, &bytes, photo_dir)?;
        }

        let records = std::slice::from_ref(&form);
        match ctx.config.persist_mode {
            PersistMode::Overwrite => ctx.store.append_and_persist(records, photo_dir),
            PersistMode::Merge => ctx.store.merge_and_persist(records, photo_dir),
        }
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            status: "ok".to_string(),
            message: "Record added and saved to the workbook.".to_string(),
            workbook: workbook.display().to_string(),
        }),
    ))
}

async fn search_records(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<TableResponse>> {
    let term = params.q.unwrap_or_default();

    let found = blocking(move || search::search(&ctx.store, &term)).await?;
    let response = match found {
        Some(table) => TableResponse {
            status: "ok".to_string(),
            message: None,
            table,
        },
        None => TableResponse {
            status: "ok".to_string(),
            message: Some("No records have been added yet.".to_string()),
            table: Table::default(),
        },
    };

    Ok(Json(response))
}

async fn download_workbook(State(ctx): State<Arc<AppContext>>) -> Result<Response> {
    if !ctx.store.exists() {
        let body = ErrorResponse {
            status: "error".to_string(),
            message: "No workbook has been written yet.".to_string(),
        };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    }

    let bytes = tokio::fs::read(ctx.store.workbook_path()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"certificate_records.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn refresh_from_database(State(ctx): State<Arc<AppContext>>) -> Result<Json<TableResponse>> {
    let mut reader = ctx.database.lock().await;

    let fetched = reader.fetch_certificates().await;
    if let Err(e) = reader.close().await {
        warn!("closing database connection failed: {}", e);
    }
    let table = fetched?;

    Ok(Json(TableResponse {
        status: "ok".to_string(),
        message: None,
        table,
    }))
}
