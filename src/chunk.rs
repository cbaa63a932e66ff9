use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A contiguous, inclusive byte range of a transfer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    #[serde(skip)]
    pub data: Option<Bytes>,
}

impl Chunk {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.data.as_ref().map_or(true, |d| d.is_empty())
    }

    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// Hands the payload over to the writer, leaving the chunk empty.
    pub fn take_data(&mut self) -> Option<Bytes> {
        self.data.take()
    }
}

/// Splits `total_size` bytes into fixed-size chunks.
///
/// This is the only place chunk boundaries are computed; both the planner and
/// the fetcher go through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    total_size: u64,
    chunk_size: u64,
}

impl ChunkLayout {
    pub fn new(total_size: u64, chunk_size: u64) -> Self {
        Self {
            total_size,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn count(&self) -> usize {
        self.total_size.div_ceil(self.chunk_size) as usize
    }

    /// Byte range of chunk `index`. The last chunk is clamped to the end of the file.
    pub fn chunk(&self, index: usize) -> Chunk {
        let start = (index as u64).saturating_mul(self.chunk_size);
        let end = start
            .saturating_add(self.chunk_size - 1)
            .min(self.total_size.saturating_sub(1));

        Chunk {
            index,
            start,
            end,
            data: None,
        }
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        (0..self.count()).map(|i| self.chunk(i)).collect()
    }
}
