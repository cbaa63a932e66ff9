use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::chunk::Chunk;
use crate::config::GrabConfig;
use crate::error::{GrabError, Result};
use crate::fetcher::ChunkFetcher;
use crate::metadata::{sidecar_path, TransferMetadata};
use crate::output::OutputFile;
use crate::pool::{Task, WorkerPool};
use crate::probe::Prober;
use crate::transfer::Transfer;

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Chunks still empty after every retry, ordered by index.
    pub missed_chunks: Vec<Chunk>,
    /// Side file describing the missed chunks, when it was kept.
    pub metadata_path: Option<PathBuf>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.missed_chunks.is_empty()
    }
}

/// Shared between the chunk tasks of one run.
#[derive(Default)]
struct RunState {
    missed: Mutex<Vec<Chunk>>,
    failure: Mutex<Option<GrabError>>,
    aborted: AtomicBool,
    written: AtomicU64,
}

impl RunState {
    async fn record_missed(&self, chunk: Chunk) {
        self.missed.lock().await.push(chunk);
    }

    /// Keeps the first fatal error and stops further tasks from starting.
    async fn abort(&self, err: GrabError) {
        let mut slot = self.failure.lock().await;
        if slot.is_none() {
            *slot = Some(err);
        }
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

pub struct Downloader {
    client: Client,
    config: GrabConfig,
}

impl Downloader {
    pub fn new(config: GrabConfig) -> Self {
        let client = config.build_client();
        Self { client, config }
    }

    pub fn config(&self) -> &GrabConfig {
        &self.config
    }

    /// Probes `url` and downloads it into the configured output directory.
    pub async fn download(&self, url: &str) -> Result<DownloadReport> {
        let mut transfer = Prober::new(self.client.clone()).probe(url).await?;
        transfer.chunk_size = self.config.chunk_size;
        self.run(&transfer).await
    }

    /// Downloads a probed transfer.
    ///
    /// Missed chunks do not fail the run; they are listed in the report and
    /// recorded in a `.meta.json` side file.
    pub async fn run(&self, transfer: &Transfer) -> Result<DownloadReport> {
        let path = transfer.full_path(&self.config.output_dir);
        let output = OutputFile::create(&path).await?;
        let pb = self.progress_bar(transfer.size, &transfer.file_name());

        let mut metadata = TransferMetadata::new(&transfer.url, transfer.size);
        let result = if transfer.is_chunkable() {
            self.download_in_chunks(transfer, &output, &pb).await
        } else {
            self.stream(transfer, &output, &pb).await.map(|n| (n, Vec::new()))
        };

        let (bytes_written, missed_chunks) = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                pb.abandon_with_message(format!("Failed      {}", transfer.file_name()));
                return Err(e);
            }
        };
        output.sync().await?;

        metadata.downloaded_size = bytes_written;
        metadata.missed_chunks = missed_chunks;

        let metadata_path = if metadata.is_complete() {
            pb.finish_with_message(format!("Completed   {}", transfer.file_name()));
            None
        } else {
            pb.abandon_with_message(format!(
                "Incomplete  {} ({} chunks missed)",
                transfer.file_name(),
                metadata.missed_chunks.len()
            ));
            self.record_missed(&metadata, &path).await?
        };

        Ok(DownloadReport {
            path,
            bytes_written,
            missed_chunks: metadata.missed_chunks,
            metadata_path,
        })
    }

    async fn record_missed(&self, metadata: &TransferMetadata, path: &Path) -> Result<Option<PathBuf>> {
        let meta_path = sidecar_path(path);
        metadata.save(&meta_path).await?;
        warn!(
            "{} chunks missed, details in {}",
            metadata.missed_chunks.len(),
            meta_path.display()
        );

        if self.config.keep_metadata {
            return Ok(Some(meta_path));
        }
        if let Err(e) = fs::remove_file(&meta_path).await {
            warn!("Failed to remove {}: {}", meta_path.display(), e);
        }
        Ok(None)
    }

    /// Single GET of the whole body, used when the size is unknown or ranges are unsupported.
    async fn stream(&self, transfer: &Transfer, output: &OutputFile, pb: &ProgressBar) -> Result<u64> {
        if transfer.size == 0 {
            info!("Size unknown, streaming {} instead of chunking", transfer.url);
        } else {
            info!("{}, streaming {} instead", GrabError::RangeNotSupported, transfer.url);
        }

        let url = transfer.url.as_str();
        self.config
            .retry
            .run("stream", |attempt| async move {
                if attempt > 1 {
                    output.truncate().await?;
                    pb.set_position(0);
                }

                let written = self.stream_once(url, output, pb).await?;
                if written == 0 {
                    return Err(GrabError::RequestFailed {
                        url: url.to_string(),
                        status: None,
                        reason: "no bytes received".to_string(),
                    });
                }
                Ok(written)
            })
            .await
    }

    async fn stream_once(&self, url: &str, output: &OutputFile, pb: &ProgressBar) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GrabError::request(url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(GrabError::status(url, status));
        }

        let mut stream = response.bytes_stream();
        let mut offset = 0u64;

        while let Some(item) = stream.next().await {
            let piece = item.map_err(|e| GrabError::request(url, e))?;
            if piece.is_empty() {
                continue;
            }
            let len = piece.len() as u64;
            output.write_at(piece, offset).await?;
            offset += len;
            pb.inc(len);
        }

        Ok(offset)
    }

    async fn download_in_chunks(
        &self,
        transfer: &Transfer,
        output: &OutputFile,
        pb: &ProgressBar,
    ) -> Result<(u64, Vec<Chunk>)> {
        let layout = transfer.layout();
        let count = layout.count();
        let pool = WorkerPool::new(count.min(self.config.worker_limit()));
        info!(
            "File size: {}, splitting download into {} chunks across {} workers",
            transfer.size,
            count,
            pool.concurrency()
        );

        let fetcher = ChunkFetcher::new(self.client.clone(), transfer.url.clone(), self.config.retry);
        let state = Arc::new(RunState::default());

        let tasks = (0..count)
            .map(|index| {
                let fetcher = fetcher.clone();
                let output = output.clone();
                let state = state.clone();
                let pb = pb.clone();

                Task::new(index, async move {
                    if state.is_aborted() {
                        return;
                    }

                    let mut chunk = layout.chunk(index);
                    if let Err(e) = fetcher.fetch(&mut chunk).await {
                        warn!("{}", e);
                        state.record_missed(chunk).await;
                        return;
                    }

                    let Some(data) = chunk.take_data() else {
                        return;
                    };
                    let len = data.len() as u64;
                    match output.write_at(data, chunk.start).await {
                        Ok(()) => {
                            state.written.fetch_add(len, Ordering::Relaxed);
                            pb.inc(len);
                            info!("Chunk {} downloaded - bytes: {}-{}", index, chunk.start, chunk.end);
                        }
                        Err(e) => {
                            error!("Failed to write chunk {}: {}", index, e);
                            state.abort(e).await;
                        }
                    }
                })
            })
            .collect();

        pool.run(tasks).await;

        if let Some(e) = state.failure.lock().await.take() {
            return Err(e);
        }

        let mut missed = std::mem::take(&mut *state.missed.lock().await);
        missed.sort_by_key(|c| c.index);

        Ok((state.written.load(Ordering::Relaxed), missed))
    }

    fn progress_bar(&self, total_size: u64, file_name: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = if total_size > 0 {
            let pb = ProgressBar::new(total_size);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4} {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {bytes:>12} {bytes_per_sec:>12} {msg}")
            {
                pb.set_style(style);
            }
            pb
        };
        pb.set_message(format!("Downloading {}", file_name));
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn write_error(path: &str) -> GrabError {
        GrabError::write(path, io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    #[tokio::test]
    async fn test_abort_keeps_the_first_write_error() {
        let state = RunState::default();
        assert!(!state.is_aborted());

        state.abort(write_error("/tmp/first")).await;
        state.abort(write_error("/tmp/second")).await;
        assert!(state.is_aborted());

        match state.failure.lock().await.take() {
            Some(GrabError::WriteFailed { path, .. }) => assert_eq!(path, PathBuf::from("/tmp/first")),
            other => panic!("unexpected failure: {:?}", other),
        };
    }

    #[tokio::test]
    async fn test_missed_chunks_are_collected_across_tasks() {
        let state = Arc::new(RunState::default());
        let layout = crate::chunk::ChunkLayout::new(40, 10);

        let handles: Vec<_> = [3, 0, 2]
            .into_iter()
            .map(|index| {
                let state = state.clone();
                let chunk = layout.chunk(index);
                tokio::spawn(async move { state.record_missed(chunk).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut missed = state.missed.lock().await.clone();
        missed.sort_by_key(|c| c.index);
        assert_eq!(missed.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 2, 3]);
        assert!(!state.is_aborted());
    }
}
