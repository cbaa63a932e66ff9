use reqwest::{header, Client};
use tracing::debug;

use crate::chunk::Chunk;
use crate::error::{GrabError, Result};
use crate::retry::RetryPolicy;

/// Fetches single byte ranges of one URL.
#[derive(Clone)]
pub struct ChunkFetcher {
    client: Client,
    url: String,
    retry: RetryPolicy,
}

impl ChunkFetcher {
    pub fn new(client: Client, url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            retry,
        }
    }

    /// Fills `chunk.data`, retrying per the policy.
    ///
    /// Exhaustion yields [`GrabError::ChunkMissed`] and leaves the chunk empty.
    pub async fn fetch(&self, chunk: &mut Chunk) -> Result<()> {
        let label = format!("chunk {}", chunk.index);
        let target: &Chunk = chunk;

        let result = self.retry.run(&label, |_| self.fetch_once(target)).await;

        match result {
            Ok(data) => {
                chunk.data = Some(data);
                Ok(())
            }
            Err(e) => Err(GrabError::ChunkMissed {
                index: chunk.index,
                attempts: self.retry.max_attempts,
                reason: e.to_string(),
            }),
        }
    }

    async fn fetch_once(&self, chunk: &Chunk) -> Result<bytes::Bytes> {
        debug!("Downloading chunk {}: with byte range {}-{}", chunk.index, chunk.start, chunk.end);

        let response = self
            .client
            .get(&self.url)
            .header(header::RANGE, chunk.range_header())
            .send()
            .await
            .map_err(|e| GrabError::request(&self.url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(GrabError::status(&self.url, status));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| GrabError::request(&self.url, e))?;

        // A server ignoring the Range header answers with the whole body.
        if data.is_empty() || data.len() as u64 != chunk.len() {
            return Err(GrabError::RequestFailed {
                url: self.url.clone(),
                status: Some(status),
                reason: format!(
                    "expected {} bytes for range {}-{}, got {}",
                    chunk.len(),
                    chunk.start,
                    chunk.end,
                    data.len()
                ),
            });
        }

        Ok(data)
    }
}
