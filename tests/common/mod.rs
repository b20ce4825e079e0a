#![allow(dead_code)]

use calamine::{Reader, Xlsx, open_workbook};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes of a small, valid JPEG.
pub fn jpeg_bytes(dir: &Path) -> Vec<u8> {
    let path = dir.join("upload-source.jpeg");
    image::RgbImage::from_pixel(4, 4, image::Rgb([180, 40, 40]))
        .save_with_format(&path, image::ImageFormat::Jpeg)
        .unwrap();
    std::fs::read(&path).unwrap()
}

/// All rows of a sheet as text, header included.
pub fn sheet_rows(workbook: &Path, sheet: &str) -> Vec<Vec<String>> {
    let mut xlsx: Xlsx<_> = open_workbook(workbook).unwrap();
    let range = xlsx.worksheet_range(sheet).unwrap();
    range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

pub fn sheet_names(workbook: &Path) -> Vec<String> {
    let xlsx: Xlsx<_> = open_workbook(workbook).unwrap();
    xlsx.sheet_names()
}

/// Raw text of one part of the xlsx package, if present.
pub fn package_part(workbook: &Path, name: &str) -> Option<String> {
    let mut archive = zip::ZipArchive::new(File::open(workbook).unwrap()).unwrap();
    let mut part = archive.by_name(name).ok()?;
    let mut text = String::new();
    part.read_to_string(&mut text).unwrap();
    Some(text)
}

/// Number of embedded media files in the package.
pub fn media_count(workbook: &Path) -> usize {
    let archive = zip::ZipArchive::new(File::open(workbook).unwrap()).unwrap();
    archive
        .file_names()
        .filter(|name| name.starts_with("xl/media/"))
        .count()
}
