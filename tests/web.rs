#![cfg(feature = "web")]

mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use certbook::app::{AppContext, router};
use certbook::config::Config;
use certbook::workbook::RECORDS_SHEET;
use common::{jpeg_bytes, sheet_rows};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

const BOUNDARY: &str = "certbook-test-boundary";

fn context(dir: &Path, persist_mode: &str) -> Arc<AppContext> {
    let workbook_dir = dir.join("workbooks").display().to_string();
    let photo_dir = dir.join("photos").display().to_string();
    let persist_mode = persist_mode.to_string();

    let config = Config::from_lookup(|key| match key {
        "WORKBOOK_DIR" => Some(workbook_dir.clone()),
        "PHOTO_DIR" => Some(photo_dir.clone()),
        "PERSIST_MODE" => Some(persist_mode.clone()),
        // Nothing listens here
        "DB_HOST" => Some("127.0.0.1".to_string()),
        "DB_PORT" => Some("1".to_string()),
        _ => None,
    });
    Arc::new(AppContext::new(config))
}

fn multipart(fields: &[(&str, &str)], photo: Option<&[u8]>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = photo {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"scan.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/records")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn steel_bar_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("product_description", "Steel Bar"),
        ("grade", "A36"),
        ("company", "Acme Co"),
        ("certificate_number", "CERT-001"),
    ]
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(ctx: &Arc<AppContext>, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(ctx.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn missing_fields_are_rejected_before_persisting() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");

    let fields = [
        ("product_description", "Steel Bar"),
        ("grade", ""),
        ("company", "Acme Co"),
        ("certificate_number", "CERT-001"),
    ];
    let (status, body) = send(&ctx, multipart(&fields, Some(b"photo".as_slice()))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("grade"));
    assert!(!ctx.store.exists());
    assert!(!dir.path().join("photos").join("CERT-001.jpg").exists());
}

#[tokio::test]
async fn certificate_number_with_path_is_rejected() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");

    let fields = [
        ("product_description", "Steel Bar"),
        ("grade", "A36"),
        ("company", "Acme Co"),
        ("certificate_number", "../escaped"),
    ];
    let (status, body) = send(&ctx, multipart(&fields, Some(b"photo".as_slice()))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("invalid certificate number"));
    assert!(!ctx.store.exists());
    assert!(!dir.path().join("escaped.jpg").exists());
    assert!(!dir.path().join("photos").exists());
}

#[tokio::test]
async fn added_record_is_searchable() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");
    let jpeg = jpeg_bytes(dir.path());

    let (status, body) = send(&ctx, multipart(&steel_bar_fields(), Some(jpeg.as_slice()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "ok");

    // Stored as .jpg although uploaded as scan.png
    let photo = dir.path().join("photos").join("CERT-001.jpg");
    assert_eq!(std::fs::read(&photo).unwrap(), jpeg);

    let rows = sheet_rows(ctx.store.workbook_path(), RECORDS_SHEET);
    assert_eq!(rows[1][3], "CERT-001");
    assert_eq!(rows[1][5], photo.display().to_string());

    let (status, body) = send(&ctx, get("/api/records?q=acme")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table"]["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["table"]["rows"][0][0], "Steel Bar");

    let (_, body) = send(&ctx, get("/api/records?q=titanium")).await;
    assert!(body["table"]["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_before_any_record_says_so() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");

    let (status, body) = send(&ctx, get("/api/records")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No records have been added yet.");
    assert!(body["table"]["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn overwrite_mode_keeps_only_latest_submission() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");

    send(&ctx, multipart(&steel_bar_fields(), None)).await;
    let second = [
        ("product_description", "Copper Sheet"),
        ("grade", "C110"),
        ("company", "Globex"),
        ("certificate_number", "CERT-002"),
    ];
    send(&ctx, multipart(&second, None)).await;

    let (_, body) = send(&ctx, get("/api/records")).await;
    let rows = body["table"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][3], "CERT-002");
}

#[tokio::test]
async fn merge_mode_accumulates_submissions() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "merge");

    send(&ctx, multipart(&steel_bar_fields(), None)).await;
    let second = [
        ("product_description", "Copper Sheet"),
        ("grade", "C110"),
        ("company", "Globex"),
        ("certificate_number", "CERT-002"),
    ];
    let (status, _) = send(&ctx, multipart(&second, None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&ctx, get("/api/records")).await;
    let rows = body["table"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][3], "CERT-001");
    assert_eq!(rows[1][3], "CERT-002");
}

#[tokio::test]
async fn download_serves_the_workbook() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");

    let (status, _) = send(&ctx, get("/api/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&ctx, multipart(&steel_bar_fields(), None)).await;

    let response = router(ctx.clone()).oneshot(get("/api/download")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), std::fs::read(ctx.store.workbook_path()).unwrap());
}

#[tokio::test]
async fn refresh_with_unreachable_database_reports_error() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");

    let request = Request::builder()
        .method("POST")
        .uri("/api/refresh")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&ctx, request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("database"));
    assert!(!ctx.database.lock().await.is_connected());

    // The service keeps answering
    let (status, _) = send(&ctx, get("/api/records")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn index_page_is_served() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), "overwrite");

    let response = router(ctx).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("name=\"certificate_number\""));
}
