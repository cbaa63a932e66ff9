use std::path::{Path, PathBuf};

use crate::chunk::ChunkLayout;
use crate::config::MEGABYTE;
use crate::error::{GrabError, Result};

/// Name used when the server does not suggest one.
pub const DEFAULT_FILE_NAME: &str = "download";

/// Everything learned about a resource before downloading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub url: String,
    pub name: String,
    pub ext: Option<String>,
    /// Total size in bytes, `0` when the server did not say.
    pub size: u64,
    pub chunk_size: u64,
    pub accepts_ranges: bool,
}

impl Transfer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: DEFAULT_FILE_NAME.to_string(),
            ext: None,
            size: 0,
            chunk_size: MEGABYTE,
            accepts_ranges: false,
        }
    }

    pub fn file_name(&self) -> String {
        match &self.ext {
            Some(ext) => format!("{}.{}", self.name, ext),
            None => self.name.clone(),
        }
    }

    pub fn full_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.file_name())
    }

    /// `Err(RangeNotSupported)` when the server did not advertise byte ranges.
    pub fn range_support(&self) -> Result<()> {
        if self.accepts_ranges {
            Ok(())
        } else {
            Err(GrabError::RangeNotSupported)
        }
    }

    /// Chunked transfer needs both a known size and range support.
    pub fn is_chunkable(&self) -> bool {
        self.size > 0 && self.range_support().is_ok()
    }

    pub fn layout(&self) -> ChunkLayout {
        ChunkLayout::new(self.size, self.chunk_size)
    }
}
