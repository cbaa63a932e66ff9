use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const MEGABYTE: u64 = 1 << 20;

/// Settings for one downloader, fixed at construction time.
#[derive(Debug, Clone)]
pub struct GrabConfig {
    /// Bytes per chunk in chunked mode.
    pub chunk_size: u64,
    pub output_dir: PathBuf,
    /// Upper bound on concurrent chunk fetches, logical CPU count when unset.
    pub workers: Option<usize>,
    pub retry: RetryPolicy,
    /// Keep the `.meta.json` side file after the run instead of removing it.
    pub keep_metadata: bool,
    pub show_progress: bool,
    pub user_agent: String,
    pub connect_timeout: Duration,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            chunk_size: MEGABYTE,
            output_dir: PathBuf::from("."),
            workers: None,
            retry: RetryPolicy::default(),
            keep_metadata: false,
            show_progress: true,
            user_agent: concat!("grab/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl GrabConfig {
    pub fn with_chunk_size_mb(mut self, megabytes: u64) -> Self {
        self.chunk_size = megabytes.max(1).saturating_mul(MEGABYTE);
        self
    }

    pub fn worker_limit(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn build_client(&self) -> Client {
        Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GrabConfig::default();
        assert_eq!(config.chunk_size, 1_048_576);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_secs(2));
        assert!(config.worker_limit() >= 1);
    }

    #[test]
    fn test_chunk_size_in_megabytes() {
        assert_eq!(GrabConfig::default().with_chunk_size_mb(4).chunk_size, 4 * MEGABYTE);
        assert_eq!(GrabConfig::default().with_chunk_size_mb(0).chunk_size, MEGABYTE);
        assert_eq!(GrabConfig::default().with_chunk_size_mb(u64::MAX).chunk_size, u64::MAX);
    }

    #[test]
    fn test_explicit_worker_limit() {
        let config = GrabConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(config.worker_limit(), 1);
    }
}
