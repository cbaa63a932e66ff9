use clap::Parser;
use grab::utils::{default_download_dir, parse_url};
use grab::GrabConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "grab", author, version, about = "Retrieve files over HTTP and HTTPS using concurrent byte-range chunks", long_about = None)]
pub struct Args {
    /// URL of the file to download
    #[arg(index = 1, value_parser = parse_url)]
    pub url: String,

    /// Chunk size in megabytes
    #[arg(short = 'c', long = "chunk-size", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=4096))]
    pub chunk_size: u64,

    /// Directory the file is saved to (defaults to $HOME/Downloads)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Maximum number of concurrent chunk downloads (defaults to number of logical CPUs)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Keep the .meta.json file describing missed chunks after the run
    #[arg(long = "keep-meta")]
    pub keep_meta: bool,

    /// Expected SHA-256 of the complete file (hex)
    #[arg(long = "sha256")]
    pub sha256: Option<String>,

    /// Log progress of individual chunks
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    pub fn output_is_default(&self) -> bool {
        self.output.is_none()
    }

    pub fn to_config(&self) -> GrabConfig {
        let output_dir = self.output.clone().unwrap_or_else(default_download_dir);
        GrabConfig {
            output_dir,
            workers: self.workers,
            keep_metadata: self.keep_meta,
            ..GrabConfig::default()
        }
        .with_chunk_size_mb(self.chunk_size)
    }
}
