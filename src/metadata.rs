//! Metadata normalization for files about to be archived
//!
//! Turns a local path plus optional user overrides into the title,
//! description, tags and MIME type stored with the archive record.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// (extension, MIME type, human label)
const FILE_TYPES: &[(&str, &str, &str)] = &[
    ("txt", "text/plain", "Text document"),
    ("md", "text/markdown", "Markdown document"),
    ("json", "application/json", "JSON data"),
    ("jpg", "image/jpeg", "JPEG image"),
    ("jpeg", "image/jpeg", "JPEG image"),
    ("png", "image/png", "PNG image"),
    ("gif", "image/gif", "GIF image"),
    ("webp", "image/webp", "WebP image"),
    ("pdf", "application/pdf", "PDF document"),
    ("doc", "application/msword", "Word document"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "Word document",
    ),
    ("xls", "application/vnd.ms-excel", "Excel spreadsheet"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "Excel spreadsheet",
    ),
    ("mp4", "video/mp4", "MP4 video"),
    ("mov", "video/quicktime", "QuickTime video"),
    ("avi", "video/x-msvideo", "AVI video"),
    ("mp3", "audio/mpeg", "MP3 audio"),
    ("wav", "audio/wav", "WAV audio"),
    ("zip", "application/zip", "ZIP archive"),
    ("rar", "application/x-rar-compressed", "RAR archive"),
    ("7z", "application/x-7z-compressed", "7-Zip archive"),
];

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
const DEFAULT_LABEL: &str = "Binary file";

/// Everything derived locally about a file before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub original_path: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub mime_type: String,
    pub file_size: u64,
}

fn lookup(path: &Path) -> Option<&'static (&'static str, &'static str, &'static str)> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    FILE_TYPES.iter().find(|(e, _, _)| *e == ext)
}

pub fn mime_type(path: &Path) -> &'static str {
    lookup(path).map_or(DEFAULT_MIME_TYPE, |&(_, mime, _)| mime)
}

pub fn file_type_label(path: &Path) -> &'static str {
    lookup(path).map_or(DEFAULT_LABEL, |&(_, _, label)| label)
}

/// `family_photo-1965.jpg` -> `Family Photo 1965`
///
/// Every letter or digit that follows a non-alphanumeric character starts a
/// word, so `(draft)_notes` -> `(Draft) Notes` and `o'neil` -> `O'Neil`.
pub fn title_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut title = String::with_capacity(stem.len());
    let mut in_word = false;
    for c in stem.chars() {
        let c = if c == '_' || c == '-' { ' ' } else { c };
        if !in_word && c.is_alphanumeric() {
            title.extend(c.to_uppercase());
        } else {
            title.push(c);
        }
        in_word = c.is_alphanumeric();
    }
    title
}

/// Split a comma-separated tag list; blank entries are dropped, order and
/// duplicates kept.
pub fn parse_tags(csv: Option<&str>) -> Vec<String> {
    csv.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    })
    .unwrap_or_default()
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[unit])
}

/// Derive archive metadata for the regular file at `path`.
pub fn normalize(
    path: &Path,
    title: Option<&str>,
    description: Option<&str>,
    tags: Option<&str>,
) -> Result<FileMetadata> {
    let stat = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;
    if !stat.is_file() {
        return Err(Error::NotAFile(path.to_path_buf()));
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::NotAFile(path.to_path_buf()))?;
    let original_path = fs::canonicalize(path)?.to_string_lossy().into_owned();

    let title = match title {
        Some(t) => t.to_string(),
        None => title_from_filename(path),
    };
    let description = match description {
        Some(d) => d.to_string(),
        None => format!("{} file: {}", file_type_label(path), filename),
    };

    Ok(FileMetadata {
        filename,
        original_path,
        title,
        description,
        tags: parse_tags(tags),
        mime_type: mime_type(path).to_string(),
        file_size: stat.len(),
    })
}
