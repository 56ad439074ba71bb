use crate::error::{RasterError, RasterResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Where image bytes referenced by `src` attributes live
pub trait AssetStore: Send + Sync {
    fn load(&self, src: &str) -> RasterResult<Vec<u8>>;

    /// Persist bytes and return the reference to store in `src`
    fn store(&self, bytes: &[u8], mime: &str) -> RasterResult<String>;
}

/// Keeps images inline as base64 `data:` URLs. Relative or `file://`
/// sources are read from `base_dir` when one is configured.
#[derive(Debug, Clone, Default)]
pub struct DataUrlStore {
    base_dir: Option<PathBuf>,
}

impl DataUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl AssetStore for DataUrlStore {
    fn load(&self, src: &str) -> RasterResult<Vec<u8>> {
        if src.starts_with("data:") {
            return decode_data_url(src).map(|(_, bytes)| bytes);
        }
        let Some(base_dir) = &self.base_dir else {
            return Err(RasterError::UnsupportedSource(src.to_string()));
        };
        let relative = src.strip_prefix("file://").unwrap_or(src);
        if relative.contains("://") {
            return Err(RasterError::UnsupportedSource(src.to_string()));
        }
        Ok(std::fs::read(base_dir.join(relative))?)
    }

    fn store(&self, bytes: &[u8], mime: &str) -> RasterResult<String> {
        Ok(encode_data_url(bytes, mime))
    }
}

/// In-process store handing out `asset://N` references
#[derive(Debug, Default)]
pub struct MemoryStore {
    assets: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, src: impl Into<String>, bytes: Vec<u8>) {
        self.assets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(src.into(), bytes);
    }

    pub fn len(&self) -> usize {
        self.assets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for MemoryStore {
    fn load(&self, src: &str) -> RasterResult<Vec<u8>> {
        if src.starts_with("data:") {
            return decode_data_url(src).map(|(_, bytes)| bytes);
        }
        self.assets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(src)
            .cloned()
            .ok_or_else(|| RasterError::NotFound(src.to_string()))
    }

    fn store(&self, bytes: &[u8], _mime: &str) -> RasterResult<String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let src = format!("asset://{}", id);
        self.insert(src.clone(), bytes.to_vec());
        Ok(src)
    }
}

/// Split a base64 `data:` URL into its mime type and payload
pub fn decode_data_url(src: &str) -> RasterResult<(String, Vec<u8>)> {
    let malformed = || RasterError::MalformedDataUrl(truncate(src));
    let rest = src.strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let mime = header.strip_suffix(";base64").ok_or_else(malformed)?;
    let bytes = STANDARD.decode(payload.trim()).map_err(|_| malformed())?;
    Ok((mime.to_string(), bytes))
}

pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

fn truncate(src: &str) -> String {
    src.chars().take(48).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_round_trip() {
        let src = encode_data_url(b"\x89PNG", "image/png");
        assert!(src.starts_with("data:image/png;base64,"));
        let (mime, bytes) = decode_data_url(&src).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"\x89PNG");
    }

    #[test]
    fn test_malformed_data_url() {
        assert!(matches!(
            decode_data_url("data:image/png,plain"),
            Err(RasterError::MalformedDataUrl(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(RasterError::MalformedDataUrl(_))
        ));
    }

    #[test]
    fn test_memory_store_hands_out_fresh_references() {
        let store = MemoryStore::new();
        let a = store.store(b"one", "image/png").unwrap();
        let b = store.store(b"two", "image/png").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.load(&b).unwrap(), b"two");
        assert!(matches!(store.load("asset://99"), Err(RasterError::NotFound(_))));
    }

    #[test]
    fn test_data_url_store_reads_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), b"bytes").unwrap();

        let store = DataUrlStore::with_base_dir(dir.path());
        assert_eq!(store.load("pic.png").unwrap(), b"bytes");
        assert_eq!(store.load("file://pic.png").unwrap(), b"bytes");
        assert!(matches!(
            store.load("https://example.com/pic.png"),
            Err(RasterError::UnsupportedSource(_))
        ));
        assert!(matches!(
            DataUrlStore::new().load("pic.png"),
            Err(RasterError::UnsupportedSource(_))
        ));
    }
}
