// Cache integration tests
//
// Tests for cache key computation (hash.rs) and file-system cache store (store.rs).

use drawtrace::cache::hash::{CacheSettings, compute_cache_key};
use drawtrace::cache::store::{CacheStore, CachedDocument};
use drawtrace::markers::MarkerSet;
use drawtrace::trace::OutputUnit;
use tempfile::tempdir;

fn settings() -> CacheSettings {
    CacheSettings {
        threshold: 128,
        perspective_correction: true,
        marker_size_mm: 50.0,
        canvas_width: 600,
        require_calibration: false,
    }
}

fn sample_document() -> CachedDocument {
    CachedDocument {
        svg: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg/>\n".to_string(),
        path_count: 3,
        unit: OutputUnit::Millimeter,
        warnings: vec!["Vectorization produced no contours".to_string()],
    }
}

// ---- hash.rs tests ----

#[test]
fn test_compute_cache_key() {
    let key = compute_cache_key(b"image bytes", None, &settings());
    assert_eq!(key.len(), 64, "Cache key should be 64 hex characters");
    assert!(
        key.chars().all(|c: char| c.is_ascii_hexdigit()),
        "Cache key should contain only hex characters"
    );
}

#[test]
fn test_cache_key_deterministic() {
    let markers = MarkerSet::from_json(r#"[{"id":1,"corners":[[0,0],[1,0],[1,1],[0,1]]}]"#)
        .expect("parse markers");
    let key1 = compute_cache_key(b"image", Some(&markers), &settings());
    let key2 = compute_cache_key(b"image", Some(&markers), &settings());
    assert_eq!(key1, key2, "Same inputs should produce the same cache key");
}

#[test]
fn test_cache_key_differs_with_different_image() {
    let key1 = compute_cache_key(b"image a", None, &settings());
    let key2 = compute_cache_key(b"image b", None, &settings());
    assert_ne!(key1, key2);
}

#[test]
fn test_cache_key_differs_with_different_markers() {
    let a = MarkerSet::from_json(r#"[{"id":1,"corners":[[0,0],[1,0],[1,1],[0,1]]}]"#).unwrap();
    let b = MarkerSet::from_json(r#"[{"id":1,"corners":[[0,0],[2,0],[2,2],[0,2]]}]"#).unwrap();
    let key1 = compute_cache_key(b"image", Some(&a), &settings());
    let key2 = compute_cache_key(b"image", Some(&b), &settings());
    assert_ne!(key1, key2);
}

#[test]
fn test_cache_key_differs_with_different_settings() {
    let key1 = compute_cache_key(b"image", None, &settings());
    let key2 = compute_cache_key(
        b"image",
        None,
        &CacheSettings {
            perspective_correction: false,
            ..settings()
        },
    );
    assert_ne!(key1, key2);
}

// ---- store.rs tests ----

#[test]
fn test_cache_store_and_retrieve() {
    let dir = tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let key = compute_cache_key(b"image", None, &settings());

    store.store(&key, &sample_document()).expect("store");
    assert!(store.contains(&key));

    let retrieved = store
        .retrieve(&key)
        .expect("retrieve")
        .expect("entry should exist");
    assert_eq!(retrieved, sample_document());
    assert!(dir.path().join(&key).join("document.svg").exists());
    assert!(dir.path().join(&key).join("metadata.json").exists());
}

#[test]
fn test_cache_miss() {
    let dir = tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let key = "0".repeat(64);
    assert!(!store.contains(&key));
    assert!(store.retrieve(&key).expect("retrieve").is_none());
}

#[test]
fn test_cache_overwrite() {
    let dir = tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    let key = "f".repeat(64);

    store.store(&key, &sample_document()).unwrap();
    let mut updated = sample_document();
    updated.path_count = 9;
    updated.unit = OutputUnit::Pixel;
    store.store(&key, &updated).unwrap();

    let retrieved = store.retrieve(&key).unwrap().unwrap();
    assert_eq!(retrieved.path_count, 9);
    assert_eq!(retrieved.unit, OutputUnit::Pixel);
    assert!(!dir.path().join(format!("{key}.tmp")).exists());
}

#[test]
fn test_cache_rejects_invalid_key() {
    let dir = tempdir().expect("create temp dir");
    let store = CacheStore::new(dir.path());
    assert!(store.store("../escape", &sample_document()).is_err());
    assert!(store.retrieve("not-a-key").is_err());
    assert!(!store.contains("not-a-key"));
}
