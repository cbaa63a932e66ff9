use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::chunk::Chunk;
use crate::error::{GrabError, Result};

/// Suffix appended to the output file's full path.
pub const METADATA_SUFFIX: &str = ".meta.json";

/// Record of a partially failed transfer.
///
/// Written next to the output file when chunks are missed; nothing reads it
/// back to resume yet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferMetadata {
    pub url: String,
    pub missed_chunks: Vec<Chunk>,
    pub total_size: u64,
    pub downloaded_size: u64,
}

impl TransferMetadata {
    pub fn new(url: impl Into<String>, total_size: u64) -> Self {
        Self {
            url: url.into(),
            total_size,
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missed_chunks.is_empty()
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_vec_pretty(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| GrabError::write(path, e))
    }

    /// Reads a side file, `None` if it is missing or unreadable.
    pub async fn load(path: &Path) -> Option<Self> {
        let content = fs::read(path).await.ok()?;
        serde_json::from_slice(&content).ok()
    }
}

/// `<target>.meta.json`, next to the target.
pub fn sidecar_path(target: &Path) -> PathBuf {
    let mut os: OsString = target.as_os_str().to_owned();
    os.push(METADATA_SUFFIX);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkLayout;
    use tempfile::tempdir;

    #[test]
    fn test_sidecar_path_keeps_extension() {
        assert_eq!(
            sidecar_path(Path::new("/data/movie.mp4")),
            PathBuf::from("/data/movie.mp4.meta.json")
        );
        assert_eq!(
            sidecar_path(Path::new("/data/download")),
            PathBuf::from("/data/download.meta.json")
        );
    }

    #[tokio::test]
    async fn test_round_trip_with_two_missed_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.bin.meta.json");
        let layout = ChunkLayout::new(5_000, 1_000);

        let mut meta = TransferMetadata::new("https://example.com/file.bin", 5_000);
        meta.missed_chunks = vec![layout.chunk(3), layout.chunk(1)];
        meta.downloaded_size = 3_000;
        meta.save(&path).await.unwrap();

        let loaded = TransferMetadata::load(&path).await.unwrap();
        assert_eq!(loaded, meta);
        assert_eq!(loaded.missed_chunks[0].index, 3);
        assert_eq!(loaded.missed_chunks[1].index, 1);
        assert!(!loaded.is_complete());
    }

    #[tokio::test]
    async fn test_field_names_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.meta.json");
        let mut meta = TransferMetadata::new("https://example.com/x", 20);
        meta.missed_chunks = vec![ChunkLayout::new(20, 10).chunk(1)];
        meta.save(&path).await.unwrap();

        let value: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["url"], "https://example.com/x");
        assert_eq!(value["total_size"], 20);
        assert_eq!(value["downloaded_size"], 0);
        assert_eq!(value["missed_chunks"][0]["start"], 10);
        assert_eq!(value["missed_chunks"][0]["end"], 19);
    }

    #[tokio::test]
    async fn test_load_missing_or_corrupt_is_none() {
        let dir = tempdir().unwrap();
        assert!(TransferMetadata::load(&dir.path().join("absent.meta.json")).await.is_none());

        let corrupt = dir.path().join("corrupt.meta.json");
        std::fs::write(&corrupt, b"{ not json").unwrap();
        assert!(TransferMetadata::load(&corrupt).await.is_none());
    }
}
