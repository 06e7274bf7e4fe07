// ファイルシステムキャッシュ: hash → SVG document
//
// Stores and retrieves traced documents on disk, keyed by SHA-256 hash.
// Entries: document.svg, metadata.json

use crate::error::TraceError;
use crate::trace::OutputUnit;
use serde_json;
use std::fs;
use std::path::{Path, PathBuf};

/// キャッシュエントリの必須ファイル。
const CACHE_FILES: &[&str] = &["document.svg", "metadata.json"];

/// ファイルシステムベースのキャッシュストア。
///
/// `<cache_dir>/<hex_hash>/` 以下に SVG とメタデータを格納する。
pub struct CacheStore {
    cache_dir: PathBuf,
}

/// キャッシュから復元されたトレース結果。
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub svg: String,
    pub path_count: usize,
    pub unit: OutputUnit,
    /// 元のパスで記録された警告メッセージ。
    pub warnings: Vec<String>,
}

/// metadata.json に保存するメタデータ。
#[derive(serde::Serialize, serde::Deserialize)]
struct CacheMetadata {
    cache_key: String,
    path_count: usize,
    unit: String,
    #[serde(default)]
    warnings: Vec<String>,
}

/// キャッシュキーが有効な SHA-256 hex 文字列であることを検証する。
///
/// 有効なキーは正確に64文字の小文字16進数([0-9a-f])である必要がある。
/// パストラバーサルや不正なディレクトリアクセスを防止する。
fn validate_cache_key(key: &str) -> crate::error::Result<()> {
    if key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        Ok(())
    } else {
        Err(TraceError::cache(format!(
            "invalid cache key: expected 64-character lowercase hex string, got '{}'",
            key
        )))
    }
}

fn str_to_unit(s: &str) -> Option<OutputUnit> {
    match s {
        "mm" => Some(OutputUnit::Millimeter),
        "px" => Some(OutputUnit::Pixel),
        _ => None,
    }
}

impl CacheStore {
    /// 指定されたディレクトリをキャッシュルートとして新しい CacheStore を作成する。
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    /// キャッシュキーからディレクトリパスを計算する。
    fn key_dir(&self, key: &str) -> crate::error::Result<PathBuf> {
        validate_cache_key(key)?;
        Ok(self.cache_dir.join(key))
    }

    /// トレース結果をキャッシュに保存する。
    ///
    /// 書き込みはアトミック: 一時ディレクトリにファイルを書き込み、
    /// 最後にrenameで最終パスに移動する。
    pub fn store(&self, key: &str, document: &CachedDocument) -> crate::error::Result<()> {
        let dir = self.key_dir(key)?;
        let tmp_dir = dir.with_extension("tmp");

        if tmp_dir.exists() {
            let _ = fs::remove_dir_all(&tmp_dir);
        }
        fs::create_dir_all(&tmp_dir).map_err(|e| TraceError::cache(e.to_string()))?;

        fs::write(tmp_dir.join("document.svg"), document.svg.as_bytes())
            .map_err(|e| TraceError::cache(e.to_string()))?;

        let metadata = CacheMetadata {
            cache_key: key.to_string(),
            path_count: document.path_count,
            unit: document.unit.suffix().to_string(),
            warnings: document.warnings.clone(),
        };
        let metadata_json = serde_json::to_string(&metadata)?;
        fs::write(tmp_dir.join("metadata.json"), metadata_json.as_bytes())
            .map_err(|e| TraceError::cache(e.to_string()))?;

        if dir.exists() {
            let _ = fs::remove_dir_all(&dir);
        }

        fs::rename(&tmp_dir, &dir).map_err(|e| TraceError::cache(e.to_string()))?;

        Ok(())
    }

    /// キャッシュからトレース結果を取得する。キャッシュミスの場合は None を返す。
    pub fn retrieve(&self, key: &str) -> crate::error::Result<Option<CachedDocument>> {
        let dir = self.key_dir(key)?;
        if !dir.exists() {
            return Ok(None);
        }

        let metadata_str = fs::read_to_string(dir.join("metadata.json"))
            .map_err(|e| TraceError::cache(e.to_string()))?;
        let metadata: CacheMetadata = serde_json::from_str(&metadata_str)?;

        if metadata.cache_key != key {
            return Err(TraceError::cache(format!(
                "cache key mismatch: expected '{}', found '{}'",
                key, metadata.cache_key
            )));
        }

        let unit = str_to_unit(&metadata.unit).ok_or_else(|| {
            TraceError::cache(format!("unknown unit in metadata: '{}'", metadata.unit))
        })?;

        let svg = fs::read_to_string(dir.join("document.svg"))
            .map_err(|e| TraceError::cache(e.to_string()))?;

        Ok(Some(CachedDocument {
            svg,
            path_count: metadata.path_count,
            unit,
            warnings: metadata.warnings,
        }))
    }

    /// キャッシュキーが存在するか確認する。
    pub fn contains(&self, key: &str) -> bool {
        match self.key_dir(key) {
            Ok(dir) => CACHE_FILES.iter().all(|f| dir.join(f).exists()),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cache_key_rejects_uppercase_hex() {
        let uppercase_key = "a".repeat(58) + "ABCDEF";
        assert_eq!(uppercase_key.len(), 64);
        assert!(validate_cache_key(&uppercase_key).is_err());
    }

    #[test]
    fn test_validate_cache_key_accepts_lowercase_hex() {
        let lowercase_key = "a".repeat(64);
        assert!(validate_cache_key(&lowercase_key).is_ok());
    }

    #[test]
    fn test_validate_cache_key_rejects_traversal() {
        assert!(validate_cache_key("../../etc/passwd").is_err());
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(str_to_unit("mm"), Some(OutputUnit::Millimeter));
        assert_eq!(str_to_unit("px"), Some(OutputUnit::Pixel));
        assert_eq!(str_to_unit("in"), None);
    }
}
