use std::path::Path;

use super::dat::parse_dat;
use super::error::{DataError, DataResult};
use super::model::{FileKind, Metadata, ParseResult};
use super::s1p::{parse_s1p_with, S1pOptions};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a measurement file.  Dispatch by extension.
///
/// Supported formats:
/// * `.s1p`          – single-port Touchstone S-parameter data
/// * `.dat` / `.txt` – tab (or whitespace) delimited frequency-domain export
pub fn load_file(path: &Path, s1p_options: &S1pOptions) -> DataResult<ParseResult> {
    match file_kind(path)? {
        FileKind::S1p => parse_s1p_with(path, s1p_options),
        FileKind::Dat => parse_dat(path),
    }
}

/// Decide which parser handles `path` from its extension (case-insensitive).
pub fn file_kind(path: &Path) -> DataResult<FileKind> {
    let ext = extension_of(path);
    match ext.as_str() {
        "s1p" => Ok(FileKind::S1p),
        "dat" | "txt" => Ok(FileKind::Dat),
        _ => Err(DataError::UnsupportedFormat(format!(".{ext}"))),
    }
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// -- Shared helpers for the parsers --

pub(crate) fn ensure_exists(path: &Path) -> DataResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DataError::FileNotFound(path.to_path_buf()))
    }
}

/// Read a whole text file as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte to a code point, so decoding itself never fails;
/// only the read can.
pub(crate) fn read_text(path: &Path) -> DataResult<String> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!(
                "{} is not valid UTF-8, decoding as Latin-1",
                path.display()
            );
            Ok(e.into_bytes().iter().map(|&b| b as char).collect())
        }
    }
}

/// Parse one numeric token; `None` for anything that is not a finite number.
pub(crate) fn parse_number(token: &str) -> Option<f64> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Metadata every parser records about its source file.
pub(crate) fn file_metadata(path: &Path, kind: FileKind) -> Metadata {
    let mut metadata = Metadata::new();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    metadata.insert("file_name".into(), name.into());
    metadata.insert("file_path".into(), path.display().to_string().into());
    metadata.insert("file_type".into(), kind.to_string().into());
    metadata
}
