// SHA-256 cache key over the source image, marker set and tracing settings
//
// The key is a SHA-256 hash encoded as a lowercase hexadecimal string.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::markers::MarkerSet;

/// トレース結果に影響する設定パラメータ。
///
/// キャッシュキー計算時にハッシュに含める設定値のみを保持する。
pub struct CacheSettings {
    pub threshold: u8,
    pub perspective_correction: bool,
    pub marker_size_mm: f64,
    pub canvas_width: u32,
    pub require_calibration: bool,
}

/// 設定を正規化JSON形式に変換する（キーはアルファベット順で固定）。
fn settings_to_canonical_json(settings: &CacheSettings) -> String {
    let mut map = BTreeMap::new();
    map.insert("canvas_width", serde_json::json!(settings.canvas_width));
    map.insert("marker_size_mm", serde_json::json!(settings.marker_size_mm));
    map.insert(
        "perspective_correction",
        serde_json::json!(settings.perspective_correction),
    );
    map.insert(
        "require_calibration",
        serde_json::json!(settings.require_calibration),
    );
    map.insert("threshold", serde_json::json!(settings.threshold));
    serde_json::to_string(&map).expect("serializing primitive cache settings to JSON must not fail")
}

/// 画像バイト列・マーカー・設定からキャッシュキー（SHA-256ハッシュ）を計算する。
///
/// ハッシュ入力: `len(image) || image || markers_canonical_json || settings_canonical_json`
/// マーカーが無い場合は `null` を使う。
pub fn compute_cache_key(
    image_bytes: &[u8],
    markers: Option<&MarkerSet>,
    settings: &CacheSettings,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update((image_bytes.len() as u64).to_le_bytes());
    hasher.update(image_bytes);

    let markers_json = markers
        .map(MarkerSet::to_canonical_json)
        .unwrap_or_else(|| "null".to_string());
    hasher.update(markers_json.as_bytes());

    let settings_json = settings_to_canonical_json(settings);
    hasher.update(settings_json.as_bytes());

    hex::encode(hasher.finalize())
}
