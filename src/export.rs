// SVG export: atomic file write with a content digest

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::TraceError;
use crate::trace::VectorDocument;

/// What was written by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub path: PathBuf,
    pub bytes: usize,
    /// Lowercase hex SHA-256 of the written markup.
    pub sha256: String,
}

/// SHA-256 of `markup` as lowercase hex.
pub fn digest(markup: &str) -> String {
    hex::encode(Sha256::digest(markup.as_bytes()))
}

/// Serialize `document` and write it to `path`.
pub fn write_svg(path: &Path, document: &VectorDocument) -> crate::error::Result<ExportRecord> {
    write_svg_markup(path, &document.to_svg())
}

/// Write already-serialized SVG markup to `path`.
///
/// 一時ファイルに書き込んでから rename するため、途中で失敗しても
/// 既存の出力が壊れることはない。
pub fn write_svg_markup(path: &Path, markup: &str) -> crate::error::Result<ExportRecord> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            TraceError::export(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, markup.as_bytes())
        .map_err(|e| TraceError::export(format!("cannot write {}: {e}", tmp_path.display())))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(TraceError::export(format!(
            "cannot move output into place at {}: {e}",
            path.display()
        )));
    }

    let record = ExportRecord {
        path: path.to_path_buf(),
        bytes: markup.len(),
        sha256: digest(markup),
    };
    debug!(path = %record.path.display(), bytes = record.bytes, "SVG written");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::trace::{ContourPolygon, OutputUnit, ViewBox};

    #[test]
    fn test_write_svg_serializes_document() {
        let doc = VectorDocument::new(
            vec![ContourPolygon {
                points: vec![Point::new(1.0, 2.0), Point::new(11.0, 2.0), Point::new(11.0, 7.0)],
            }],
            ViewBox {
                min_x: -4.0,
                min_y: -3.0,
                width: 20.0,
                height: 15.0,
            },
            OutputUnit::Millimeter,
            0.5,
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.svg");

        let record = write_svg(&path, &doc).unwrap();
        let expected = doc.to_svg();
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
        assert_eq!(record.bytes, expected.len());
        assert_eq!(record.sha256, digest(&expected));
        assert_eq!(record.path, path);
    }

    #[test]
    fn test_write_creates_parent_and_reports_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.svg");
        let record = write_svg_markup(&path, "<svg/>\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<svg/>\n");
        assert_eq!(record.bytes, 7);
        assert_eq!(record.sha256, digest("<svg/>\n"));
        assert!(!dir.path().join("nested/out.svg.tmp").exists());
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.svg");
        write_svg_markup(&path, "first").unwrap();
        write_svg_markup(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
