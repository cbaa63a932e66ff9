use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{GrabError, Result};

/// Output file shared by concurrent writers.
///
/// Writes are positioned: every call names its own offset and no cursor is
/// shared, so writers covering disjoint ranges need no locking.
#[derive(Clone, Debug)]
pub struct OutputFile {
    file: Arc<File>,
    path: PathBuf,
}

impl OutputFile {
    /// Creates (or truncates) the file, creating missing parent directories.
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GrabError::write(parent, e))?;
        }

        let owned = path.to_path_buf();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .read(true)
                .open(&owned)
        })
        .await
        .map_err(|e| GrabError::write(path, io::Error::other(e)))?
        .map_err(|e| GrabError::write(path, e))?;

        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes all of `data` at `offset`.
    pub async fn write_at(&self, data: Bytes, offset: u64) -> Result<()> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || write_all_at(&file, &data, offset))
            .await
            .map_err(|e| GrabError::write(&self.path, io::Error::other(e)))?
            .map_err(|e| GrabError::write(&self.path, e))
    }

    /// Drops any content, used before restarting a streamed download.
    pub async fn truncate(&self) -> Result<()> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.set_len(0))
            .await
            .map_err(|e| GrabError::write(&self.path, io::Error::other(e)))?
            .map_err(|e| GrabError::write(&self.path, e))
    }

    pub async fn sync(&self) -> Result<()> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.sync_all())
            .await
            .map_err(|e| GrabError::write(&self.path, io::Error::other(e)))?
            .map_err(|e| GrabError::write(&self.path, e))
    }
}

#[cfg(unix)]
fn write_all_at(file: &File, data: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(data, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut data: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !data.is_empty() {
        match file.seek_write(data, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                data = &data[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_out_of_order_writes_land_at_their_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");
        let out = OutputFile::create(&path).await.unwrap();

        let writes = vec![
            out.write_at(Bytes::from_static(b"World"), 5),
            out.write_at(Bytes::from_static(b"!"), 10),
            out.write_at(Bytes::from_static(b"Hello"), 0),
        ];
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }
        out.sync().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "HelloWorld!");
    }

    #[tokio::test]
    async fn test_truncate_discards_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let out = OutputFile::create(&path).await.unwrap();

        out.write_at(Bytes::from_static(b"stale data"), 0).await.unwrap();
        out.truncate().await.unwrap();
        out.write_at(Bytes::from_static(b"new"), 0).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_create_in_unwritable_location_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = OutputFile::create(&blocker.join("out.bin")).await.unwrap_err();
        assert!(matches!(err, GrabError::WriteFailed { .. }));
    }
}
